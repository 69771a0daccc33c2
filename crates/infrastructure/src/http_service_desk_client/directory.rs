use super::*;

use deskform_application::ServiceDeskDirectory;
use deskform_domain::{RequestTypeSummary, ServiceDeskSummary};
use url::form_urlencoded;

const DIRECTORY_PAGE_LIMIT: usize = 50;

/// One page of a `servicedeskapi` listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub(super) struct PagedResponse<T> {
    #[serde(default)]
    pub(super) values: Vec<T>,
    #[serde(default = "single_page")]
    pub(super) is_last_page: bool,
}

fn single_page() -> bool {
    true
}

pub(super) fn service_desks_path() -> &'static str {
    "/rest/servicedeskapi/servicedesk"
}

pub(super) fn request_types_path(service_desk_id: u64) -> String {
    format!("/rest/servicedeskapi/servicedesk/{service_desk_id}/requesttype")
}

pub(super) fn page_path(path: &str, start: usize, group_id: Option<u64>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("start", start.to_string().as_str())
        .append_pair("limit", DIRECTORY_PAGE_LIMIT.to_string().as_str());
    if let Some(group_id) = group_id {
        query.append_pair("groupId", group_id.to_string().as_str());
    }

    format!("{path}?{}", query.finish())
}

impl HttpServiceDeskClient {
    async fn fetch_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        group_id: Option<u64>,
        context: &str,
    ) -> AppResult<Vec<T>> {
        let mut items = Vec::new();
        loop {
            let page: PagedResponse<T> = self
                .send_json(
                    self.request(
                        reqwest::Method::GET,
                        &page_path(path, items.len(), group_id),
                    ),
                    context,
                )
                .await?;

            let done = page.is_last_page || page.values.is_empty();
            items.extend(page.values);
            if done {
                break;
            }
        }

        debug!(path, item_count = items.len(), "{context} listed");
        Ok(items)
    }
}

#[async_trait]
impl ServiceDeskDirectory for HttpServiceDeskClient {
    async fn list_service_desks(&self) -> AppResult<Vec<ServiceDeskSummary>> {
        self.fetch_all_pages(service_desks_path(), None, "service desks")
            .await
    }

    async fn list_request_types(
        &self,
        service_desk_id: u64,
        group_id: Option<u64>,
    ) -> AppResult<Vec<RequestTypeSummary>> {
        self.fetch_all_pages(
            &request_types_path(service_desk_id),
            group_id,
            "request types",
        )
        .await
    }
}
