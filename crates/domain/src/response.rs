use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Customer on whose behalf a request was raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reporter {
    /// Email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Atlassian account id.
    pub account_id: String,
}

/// One field echoed back on the created issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueField {
    /// Field id.
    pub id: String,
    /// Field label.
    pub label: String,
    /// Rendered value as returned by the service.
    pub value: Value,
}

/// Issue created for the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
    /// Numeric issue id.
    pub id: i64,
    /// Issue key, for example `HELP-12`.
    pub key: String,
    /// Reporter of the issue.
    pub reporter: Reporter,
    /// Service desk project key.
    pub service_desk_key: String,
    /// Request type name.
    pub request_type_name: String,
    /// Request type id.
    pub request_type_id: i64,
    /// Issue summary.
    pub summary: String,
    /// Workflow status.
    pub status: String,
    /// Creation date.
    pub date: String,
    /// Echoed issue fields.
    pub fields: Vec<IssueField>,
}

/// Response of the request-creation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRequestResponse {
    /// Reporter of the request.
    pub reporter: Reporter,
    /// Request type name.
    pub request_type_name: String,
    /// Key of the created request.
    pub key: String,
    /// Issue type id.
    pub issue_type: String,
    /// Issue type name.
    pub issue_type_name: String,
    /// Created issue.
    pub issue: Issue,
    /// Whether the reporter may create further issues.
    pub can_create_issues: bool,
    /// Whether the reporter may comment.
    pub can_add_comment: bool,
    /// Link to the issue.
    pub issue_link_url: String,
    /// Base URL of the request details page.
    pub request_details_base_url: String,
}
