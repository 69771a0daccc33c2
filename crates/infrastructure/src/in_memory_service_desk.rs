use std::collections::HashMap;

use async_trait::async_trait;
use deskform_application::{
    AutocompleteLookup, AutocompleteQuery, FormReference, FormSource, RequestSubmitter,
    ServiceDeskDirectory,
};
use deskform_core::{AppError, AppResult};
use deskform_domain::{
    CreateRequestResponse, FormMetadata, Issue, OptionSummary, ParsedForm, PayloadValue,
    RequestTypeSummary, ServiceDeskSummary, SubmissionPayload,
};
use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory service desk serving stored forms and recording submissions.
#[derive(Debug, Default)]
pub struct InMemoryServiceDesk {
    forms: RwLock<HashMap<FormReference, Value>>,
    candidates: RwLock<HashMap<String, Vec<OptionSummary>>>,
    service_desks: RwLock<Vec<ServiceDeskSummary>>,
    request_types: RwLock<Vec<RequestTypeSummary>>,
    submissions: RwLock<Vec<SubmissionPayload>>,
}

impl InMemoryServiceDesk {
    /// Creates an empty service desk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the raw definition served for a request type.
    pub async fn insert_form(&self, reference: FormReference, raw: Value) {
        self.forms.write().await.insert(reference, raw);
    }

    /// Parses a stored definition and registers it under its own portal and
    /// request type, listing both in the directory.
    pub async fn load_form(&self, raw: Value) -> AppResult<FormReference> {
        let form = ParsedForm::parse(&raw)?;
        let metadata = form.metadata();
        let reference = FormReference::new(
            parse_id("portal id", metadata.portal_id())?,
            parse_id("request type id", metadata.request_type_id())?,
        );

        let service_desk_id = metadata
            .service_desk_id()
            .unwrap_or(metadata.portal_id())
            .to_owned();
        self.insert_service_desk(ServiceDeskSummary {
            id: service_desk_id.clone(),
            project_id: metadata.project_id().unwrap_or_default().to_owned(),
            project_key: String::new(),
            project_name: metadata.portal_name().to_owned(),
        })
        .await;
        self.insert_request_type(request_type_entry(metadata, service_desk_id))
            .await;
        self.insert_form(reference, raw).await;

        Ok(reference)
    }

    /// Lists a service desk, replacing any entry with the same id.
    pub async fn insert_service_desk(&self, desk: ServiceDeskSummary) {
        let mut desks = self.service_desks.write().await;
        desks.retain(|existing| existing.id != desk.id);
        desks.push(desk);
    }

    /// Lists a request type under its service desk, replacing any entry with
    /// the same id.
    pub async fn insert_request_type(&self, request_type: RequestTypeSummary) {
        let mut request_types = self.request_types.write().await;
        request_types.retain(|existing| {
            existing.id != request_type.id || existing.service_desk_id != request_type.service_desk_id
        });
        request_types.push(request_type);
    }

    /// Stores object-picker candidates for a field key.
    pub async fn insert_candidates(
        &self,
        field_key: impl Into<String>,
        candidates: Vec<OptionSummary>,
    ) {
        self.candidates
            .write()
            .await
            .insert(field_key.into(), candidates);
    }

    /// Returns every payload submitted so far.
    pub async fn submissions(&self) -> Vec<SubmissionPayload> {
        self.submissions.read().await.clone()
    }
}

fn parse_id(name: &str, value: &str) -> AppResult<u64> {
    value.parse::<u64>().map_err(|error| {
        AppError::Validation(format!("stored form has an invalid {name} '{value}': {error}"))
    })
}

fn request_type_entry(metadata: &FormMetadata, service_desk_id: String) -> RequestTypeSummary {
    RequestTypeSummary {
        id: metadata.request_type_id().to_owned(),
        name: metadata.form_name().to_owned(),
        description: metadata.form_description_html().to_owned(),
        service_desk_id,
        group_ids: Vec::new(),
    }
}

#[async_trait]
impl FormSource for InMemoryServiceDesk {
    async fn fetch_form(&self, reference: FormReference) -> AppResult<Value> {
        self.forms
            .read()
            .await
            .get(&reference)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no form stored for {reference}")))
    }
}

#[async_trait]
impl AutocompleteLookup for InMemoryServiceDesk {
    async fn lookup(&self, query: AutocompleteQuery) -> AppResult<Vec<OptionSummary>> {
        let needle = query.query.to_lowercase();
        let candidates = self.candidates.read().await;

        Ok(candidates
            .get(query.field_key.as_str())
            .map(|candidates| {
                candidates
                    .iter()
                    .filter(|candidate| candidate.display_value.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ServiceDeskDirectory for InMemoryServiceDesk {
    async fn list_service_desks(&self) -> AppResult<Vec<ServiceDeskSummary>> {
        Ok(self.service_desks.read().await.clone())
    }

    async fn list_request_types(
        &self,
        service_desk_id: u64,
        group_id: Option<u64>,
    ) -> AppResult<Vec<RequestTypeSummary>> {
        let service_desk_id = service_desk_id.to_string();
        let known = self
            .service_desks
            .read()
            .await
            .iter()
            .any(|desk| desk.id == service_desk_id);
        if !known {
            return Err(AppError::NotFound(format!(
                "no service desk stored with id {service_desk_id}"
            )));
        }

        let group_id = group_id.map(|group_id| group_id.to_string());
        Ok(self
            .request_types
            .read()
            .await
            .iter()
            .filter(|request_type| request_type.service_desk_id == service_desk_id)
            .filter(|request_type| {
                group_id
                    .as_deref()
                    .is_none_or(|group_id| request_type.in_group(group_id))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RequestSubmitter for InMemoryServiceDesk {
    async fn submit(&self, payload: &SubmissionPayload) -> AppResult<CreateRequestResponse> {
        let mut submissions = self.submissions.write().await;
        submissions.push(payload.clone());

        let key = format!("DRY-{}", submissions.len());
        let summary = match payload.get("summary") {
            Some(PayloadValue::Single(summary)) => summary.clone(),
            _ => String::new(),
        };

        Ok(CreateRequestResponse {
            key: key.clone(),
            issue: Issue {
                id: i64::try_from(submissions.len()).unwrap_or(i64::MAX),
                key,
                summary,
                status: "Dry run".to_owned(),
                request_type_id: payload.request_type_id().parse().unwrap_or_default(),
                ..Issue::default()
            },
            ..CreateRequestResponse::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use deskform_application::{
        AutocompleteLookup, AutocompleteQuery, FormReference, FormSource, RequestSubmitter,
        ServiceDeskDirectory,
    };
    use deskform_core::AppError;
    use deskform_domain::{
        CoercedValue, FieldValues, OptionSummary, ParsedForm, RequestTypeSummary,
        ServiceDeskSummary, SubmissionPayload,
    };
    use serde_json::json;

    use super::InMemoryServiceDesk;

    fn asset_query(query: &str) -> AutocompleteQuery {
        AutocompleteQuery {
            portal_id: "5".to_owned(),
            request_type_id: "42".to_owned(),
            field_key: "customfield_10200".to_owned(),
            query: query.to_owned(),
            form_field_keys: vec!["summary".to_owned()],
        }
    }

    #[tokio::test]
    async fn stored_forms_are_served_by_reference() {
        let desk = InMemoryServiceDesk::new();
        desk.insert_form(FormReference::new(5, 42), json!({"portal": {"id": 5}}))
            .await;

        let found = desk.fetch_form(FormReference::new(5, 42)).await;
        assert_eq!(found.ok(), Some(json!({"portal": {"id": 5}})));

        let missing = desk.fetch_form(FormReference::new(5, 43)).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn candidates_are_filtered_case_insensitively() {
        let desk = InMemoryServiceDesk::new();
        desk.insert_candidates(
            "customfield_10200",
            vec![
                OptionSummary::new("88", "MacBook Pro 14"),
                OptionSummary::new("91", "ThinkPad X1"),
            ],
        )
        .await;

        let filtered = desk.lookup(asset_query("macb")).await.unwrap_or_default();
        assert_eq!(filtered, vec![OptionSummary::new("88", "MacBook Pro 14")]);

        let all = desk.lookup(asset_query("")).await.unwrap_or_default();
        assert_eq!(all.len(), 2);

        let mut other_field = asset_query("");
        other_field.field_key = "customfield_1".to_owned();
        assert!(desk.lookup(other_field).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn submissions_are_recorded_with_sequential_keys() {
        let desk = InMemoryServiceDesk::new();
        let raw = json!({
            "portal": {"id": 5},
            "reqCreate": {"id": 42, "fields": [
                {"fieldType": "text", "fieldId": "summary", "label": "Summary"}
            ]}
        });
        let form = ParsedForm::parse(&raw).unwrap_or_else(|_| unreachable!());
        let values = FieldValues::from([(
            "summary".to_owned(),
            CoercedValue::Text("Printer jam".to_owned()),
        )]);
        let payload =
            SubmissionPayload::build(&form, &values).unwrap_or_else(|_| unreachable!());

        let first = desk.submit(&payload).await.unwrap_or_default();
        let second = desk.submit(&payload).await.unwrap_or_default();

        assert_eq!(first.key, "DRY-1");
        assert_eq!(first.issue.summary, "Printer jam");
        assert_eq!(first.issue.request_type_id, 42);
        assert_eq!(second.key, "DRY-2");
        assert_eq!(desk.submissions().await.len(), 2);
    }

    #[tokio::test]
    async fn loaded_form_is_listed_in_the_directory() {
        let desk = InMemoryServiceDesk::new();
        let raw = json!({
            "portal": {"id": 5, "serviceDeskId": "9", "projectId": 10001, "name": "IT Help",
                       "description": "Ask the IT team"},
            "reqCreate": {"id": 42, "form": {"name": "Get a laptop"}, "fields": []}
        });

        let reference = desk.load_form(raw.clone()).await;
        assert_eq!(reference.ok(), Some(FormReference::new(5, 42)));
        assert_eq!(desk.fetch_form(FormReference::new(5, 42)).await.ok(), Some(raw));

        let desks = desk.list_service_desks().await.unwrap_or_default();
        assert_eq!(
            desks,
            vec![ServiceDeskSummary {
                id: "9".to_owned(),
                project_id: "10001".to_owned(),
                project_key: String::new(),
                project_name: "IT Help".to_owned(),
            }]
        );

        let request_types = desk.list_request_types(9, None).await.unwrap_or_default();
        assert_eq!(request_types.len(), 1);
        assert_eq!(request_types[0].name, "Get a laptop");
    }

    #[tokio::test]
    async fn request_types_are_filtered_by_desk_and_group() {
        let desk = InMemoryServiceDesk::new();
        desk.insert_service_desk(ServiceDeskSummary {
            id: "9".to_owned(),
            ..ServiceDeskSummary::default()
        })
        .await;
        for (id, group) in [("25", "12"), ("26", "13")] {
            desk.insert_request_type(RequestTypeSummary {
                id: id.to_owned(),
                service_desk_id: "9".to_owned(),
                group_ids: vec![group.to_owned()],
                ..RequestTypeSummary::default()
            })
            .await;
        }

        assert_eq!(desk.list_request_types(9, None).await.unwrap_or_default().len(), 2);

        let grouped = desk.list_request_types(9, Some(13)).await.unwrap_or_default();
        let ids: Vec<&str> = grouped.iter().map(|request_type| request_type.id.as_str()).collect();
        assert_eq!(ids, vec!["26"]);

        let unknown = desk.list_request_types(4, None).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn form_with_non_numeric_ids_cannot_be_loaded() {
        let desk = InMemoryServiceDesk::new();
        let raw = json!({"portal": {"id": "it-help"}, "reqCreate": {"id": 42, "fields": []}});

        assert!(matches!(desk.load_form(raw).await, Err(AppError::Validation(_))));
    }
}
