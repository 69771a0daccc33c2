use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use deskform_application::{
    AutocompleteLookup, AutocompleteQuery, FormReference, FormSource, RequestSubmitter,
};
use deskform_core::{AppError, AppResult};
use deskform_domain::{CreateRequestResponse, OptionSummary, SubmissionPayload};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

mod directory;
mod form_encoding;


use form_encoding::encode_submission;

const ATLASSIAN_TOKEN_HEADER: &str = "X-Atlassian-Token";

/// Account used to authenticate against the customer portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeskCredentials {
    /// Site root, for example `https://example.atlassian.net`.
    pub base_url: String,
    /// Account email.
    pub username: String,
    /// API token of the account.
    pub api_token: String,
}

/// HTTP adapter for the Service Desk customer portal.
pub struct HttpServiceDeskClient {
    http_client: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl HttpServiceDeskClient {
    /// Creates a client for the given site and account.
    pub fn new(
        http_client: reqwest::Client,
        credentials: ServiceDeskCredentials,
    ) -> AppResult<Self> {
        let base_url = Url::parse(credentials.base_url.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid service desk base url '{}': {error}",
                credentials.base_url
            ))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "service desk base url '{}' must use http or https",
                credentials.base_url
            )));
        }

        let basic = STANDARD.encode(format!(
            "{}:{}",
            credentials.username, credentials.api_token
        ));

        Ok(Self {
            http_client,
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
            authorization: format!("Basic {basic}"),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, self.endpoint(path))
            .header(reqwest::header::AUTHORIZATION, self.authorization.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(ATLASSIAN_TOKEN_HEADER, "no-check")
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        context: &str,
    ) -> AppResult<T> {
        let response = builder.send().await.map_err(|error| {
            AppError::Transport(format!("{context} request failed: {error}"))
        })?;

        let status = response.status();
        if !matches!(status.as_u16(), 200 | 201) {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(status_error(status.as_u16(), context, body));
        }

        response.json::<T>().await.map_err(|error| {
            AppError::Parse(format!("{context} returned an unreadable body: {error}"))
        })
    }

    async fn fetch_proforma_options(&self, reference: FormReference) -> AppResult<Value> {
        let tenant: TenantInfo = self
            .send_json(
                self.request(reqwest::Method::GET, "/_edge/tenant_info"),
                "tenant info",
            )
            .await?;

        self.send_json(
            self.request(reqwest::Method::GET, &form_choices_path(&tenant.cloud_id, reference)),
            "proforma form choices",
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantInfo {
    cloud_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AutocompleteResponse {
    results: Vec<AutocompleteResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AutocompleteResult {
    object_id: Option<Value>,
    label: String,
}

fn status_error(status: u16, context: &str, body: String) -> AppError {
    match status {
        401 | 403 => AppError::Unauthorized(format!(
            "{context} was rejected with status {status}: {body}"
        )),
        404 => AppError::NotFound(format!("{context} returned status 404: {body}")),
        _ => AppError::Remote { status, body },
    }
}

fn models_request_body(reference: FormReference, base_url: &str) -> Value {
    json!({
        "options": {
            "portalWebFragments": {
                "portalId": reference.portal_id,
                "requestTypeId": reference.request_type_id,
                "portalPage": "CREATE_REQUEST",
            },
            "portal": {"id": reference.portal_id},
            "reqCreate": {"portalId": reference.portal_id, "id": reference.request_type_id},
            "portalId": reference.portal_id,
        },
        "models": ["portalWebFragments", "portal", "reqCreate"],
        "context": {"clientBasePath": format!("{base_url}/servicedesk/customer")},
    })
}

fn form_choices_path(cloud_id: &str, reference: FormReference) -> String {
    format!(
        "/gateway/api/proforma/portal/cloudid/{cloud_id}/api/3/portal/{}/requesttype/{}/formchoices",
        reference.portal_id, reference.request_type_id
    )
}

fn autocomplete_path(query: &AutocompleteQuery) -> String {
    format!(
        "/rest/servicedesk/cmdb/1/customer/portal/{}/request/{}/field/{}/autocomplete",
        query.portal_id, query.request_type_id, query.field_key
    )
}

/// The create path is addressed by portal id. The portal's service desk id
/// is a different number on most sites and is not valid here.
fn submission_path(payload: &SubmissionPayload) -> String {
    format!(
        "/servicedesk/customer/portal/{}/create/{}",
        payload.portal_id(),
        payload.request_type_id()
    )
}

/// Lookup body; every standard field of the form is sent blank as context.
fn autocomplete_body(query: &AutocompleteQuery) -> Value {
    let field_value_map: serde_json::Map<String, Value> = query
        .form_field_keys
        .iter()
        .map(|key| (key.clone(), Value::String(String::new())))
        .collect();

    json!({"fieldValueMap": field_value_map, "query": query.query})
}

/// Places fetched proforma options where the form parser expects them.
fn inject_proforma_options(raw: &mut Value, options: Value) {
    if let Some(template) = raw
        .get_mut("reqCreate")
        .and_then(|req_create| req_create.get_mut("proformaTemplateForm"))
        .and_then(Value::as_object_mut)
    {
        template.insert("proformaFieldOptions".to_owned(), options);
    }
}

fn has_proforma_template(raw: &Value) -> bool {
    raw.get("reqCreate")
        .and_then(|req_create| req_create.get("proformaTemplateForm"))
        .is_some_and(Value::is_object)
}

fn option_summaries(response: AutocompleteResponse) -> Vec<OptionSummary> {
    response
        .results
        .into_iter()
        .filter_map(|result| {
            let id = match result.object_id? {
                Value::String(id) => id,
                Value::Number(id) => id.to_string(),
                _ => return None,
            };
            Some(OptionSummary::new(id, result.label))
        })
        .collect()
}

#[async_trait]
impl FormSource for HttpServiceDeskClient {
    async fn fetch_form(&self, reference: FormReference) -> AppResult<Value> {
        let mut raw: Value = self
            .send_json(
                self.request(reqwest::Method::POST, "/rest/servicedesk/1/customer/models")
                    .json(&models_request_body(reference, self.base_url.as_str())),
                "customer models",
            )
            .await?;

        if has_proforma_template(&raw) {
            let options = match self.fetch_proforma_options(reference).await {
                Ok(options) => options,
                Err(error) => {
                    warn!(%reference, error = %error, "proforma options unavailable");
                    json!({})
                }
            };
            inject_proforma_options(&mut raw, options);
        }

        debug!(%reference, "customer models fetched");
        Ok(raw)
    }
}

#[async_trait]
impl AutocompleteLookup for HttpServiceDeskClient {
    async fn lookup(&self, query: AutocompleteQuery) -> AppResult<Vec<OptionSummary>> {
        let response: AutocompleteResponse = self
            .send_json(
                self.request(reqwest::Method::POST, &autocomplete_path(&query))
                    .json(&autocomplete_body(&query)),
                "object picker autocomplete",
            )
            .await?;

        Ok(option_summaries(response))
    }
}

#[async_trait]
impl RequestSubmitter for HttpServiceDeskClient {
    async fn submit(&self, payload: &SubmissionPayload) -> AppResult<CreateRequestResponse> {
        let body = encode_submission(payload)?;

        self.send_json(
            self.request(reqwest::Method::POST, &submission_path(payload))
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(body),
            "request creation",
        )
        .await
    }
}
