use serde::{Deserialize, Serialize};

use crate::{FieldDescriptor, FieldKind, FieldOption, FormMetadata};

/// Read-only projection of a field for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    /// Field key.
    pub key: String,
    /// Field label.
    pub label: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Remote `fieldType`.
    pub remote_type: String,
    /// Description.
    pub description: String,
    /// Whether the field is required.
    pub required: bool,
    /// Whether the portal shows the field to customers.
    pub displayed: bool,
    /// Parent key for cascading children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
}

impl From<&FieldDescriptor> for FieldSummary {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            key: field.key().to_owned(),
            label: field.label().to_owned(),
            kind: field.kind(),
            remote_type: field.remote_type().to_owned(),
            description: field.description().to_owned(),
            required: field.is_required(),
            displayed: field.is_displayed(),
            parent_key: field.parent_key().map(str::to_owned),
        }
    }
}

/// An `{id, displayValue}` candidate for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSummary {
    /// Option or object identifier.
    pub id: String,
    /// Human-readable value.
    pub display_value: String,
}

impl OptionSummary {
    /// Creates a candidate.
    #[must_use]
    pub fn new(id: impl Into<String>, display_value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_value: display_value.into(),
        }
    }
}

impl From<&FieldOption> for OptionSummary {
    fn from(option: &FieldOption) -> Self {
        Self::new(option.id(), option.display_value())
    }
}

/// Descriptive metadata of a fetched form.
///
/// The anti-forgery token is left out; it is only meant for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    /// Portal id.
    pub portal_id: String,
    /// Request type id.
    pub request_type_id: String,
    /// Service desk id, when the portal reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_desk_id: Option<String>,
    /// Jira project id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Portal name.
    pub portal_name: String,
    /// Portal description.
    pub portal_description: String,
    /// Request type form name.
    pub form_name: String,
    /// Request type form description, as HTML.
    pub form_description_html: String,
    /// Proforma template id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proforma_template_id: Option<i64>,
    /// Proforma template form uuid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proforma_template_uuid: Option<String>,
    /// Last update of the proforma template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&FormMetadata> for FormSummary {
    fn from(metadata: &FormMetadata) -> Self {
        Self {
            portal_id: metadata.portal_id().to_owned(),
            request_type_id: metadata.request_type_id().to_owned(),
            service_desk_id: metadata.service_desk_id().map(str::to_owned),
            project_id: metadata.project_id().map(str::to_owned),
            portal_name: metadata.portal_name().to_owned(),
            portal_description: metadata.portal_description().to_owned(),
            form_name: metadata.form_name().to_owned(),
            form_description_html: metadata.form_description_html().to_owned(),
            proforma_template_id: metadata.proforma_template_id(),
            proforma_template_uuid: metadata.proforma_template_uuid().map(str::to_owned),
            updated_at: metadata.updated_at().map(str::to_owned),
        }
    }
}

/// A service desk project visible to the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceDeskSummary {
    /// Service desk id.
    pub id: String,
    /// Jira project id.
    pub project_id: String,
    /// Jira project key.
    pub project_key: String,
    /// Jira project name.
    pub project_name: String,
}

/// A request type offered by a service desk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestTypeSummary {
    /// Request type id.
    pub id: String,
    /// Request type name.
    pub name: String,
    /// Plain-text description.
    pub description: String,
    /// Owning service desk id.
    pub service_desk_id: String,
    /// Ids of the portal groups listing the request type.
    pub group_ids: Vec<String>,
}

impl RequestTypeSummary {
    /// Returns whether the request type is listed in the given portal group.
    #[must_use]
    pub fn in_group(&self, group_id: &str) -> bool {
        self.group_ids.iter().any(|id| id == group_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{FieldSummary, FormSummary, RequestTypeSummary};
    use crate::{FieldDescriptor, FieldKind, ParsedForm};

    #[test]
    fn hidden_fields_are_projected_as_not_displayed() {
        let hidden = FieldDescriptor::new("customfield_9", "Internal", FieldKind::Text, "text")
            .unwrap_or_else(|_| unreachable!())
            .displayed(false);

        let summary = FieldSummary::from(&hidden);
        assert!(!summary.displayed);
        assert!(!summary.required);
    }

    #[test]
    fn form_summary_carries_portal_and_template_details() {
        let raw = json!({
            "xsrfToken": "xsrf-1",
            "portal": {
                "id": 5,
                "serviceDeskId": "9",
                "projectId": 10001,
                "name": "IT Help",
                "description": "Ask the IT team"
            },
            "reqCreate": {
                "id": 42,
                "form": {"name": "Get a laptop", "descriptionHtml": "<p>New hardware</p>"},
                "fields": [],
                "proformaTemplateForm": {
                    "updated": "2024-05-01T09:30:00Z",
                    "design": {
                        "settings": {"templateId": 3, "templateFormUuid": "c0ffee"},
                        "questions": {}
                    }
                }
            }
        });
        let form = ParsedForm::parse(&raw).unwrap_or_else(|_| unreachable!());

        let summary = FormSummary::from(form.metadata());
        assert_eq!(summary.portal_id, "5");
        assert_eq!(summary.service_desk_id.as_deref(), Some("9"));
        assert_eq!(summary.portal_description, "Ask the IT team");
        assert_eq!(summary.form_description_html, "<p>New hardware</p>");
        assert_eq!(summary.proforma_template_id, Some(3));
        assert_eq!(summary.proforma_template_uuid.as_deref(), Some("c0ffee"));
        assert_eq!(summary.updated_at.as_deref(), Some("2024-05-01T09:30:00Z"));

        let rendered = serde_json::to_value(&summary).unwrap_or_default();
        assert!(rendered.get("xsrfToken").is_none());
        assert_eq!(rendered["formName"], "Get a laptop");
    }

    #[test]
    fn request_types_deserialize_from_remote_listing() {
        let request_type: RequestTypeSummary = serde_json::from_value(json!({
            "id": "25",
            "name": "Get IT help",
            "description": "Request assistance",
            "serviceDeskId": "9",
            "groupIds": ["12", "13"],
            "icon": {"id": "10100"}
        }))
        .unwrap_or_default();

        assert_eq!(request_type.id, "25");
        assert!(request_type.in_group("13"));
        assert!(!request_type.in_group("14"));
    }
}
