use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use deskform_core::AppResult;
use deskform_domain::{CreateRequestResponse, OptionSummary, SubmissionPayload};
use serde_json::Value;

/// Portal request type whose form is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormReference {
    /// Service desk portal id.
    pub portal_id: u64,
    /// Request type id within the portal.
    pub request_type_id: u64,
}

impl FormReference {
    /// Creates a form reference.
    #[must_use]
    pub fn new(portal_id: u64, request_type_id: u64) -> Self {
        Self {
            portal_id,
            request_type_id,
        }
    }
}

impl Display for FormReference {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "portal {} request type {}",
            self.portal_id, self.request_type_id
        )
    }
}

/// Lookup of object-picker candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteQuery {
    /// Portal id of the fetched form.
    pub portal_id: String,
    /// Request type id of the fetched form.
    pub request_type_id: String,
    /// Key of the object-picker field.
    pub field_key: String,
    /// Free-text filter, empty for no filter.
    pub query: String,
    /// Keys of the form's standard fields, sent to the portal as lookup context.
    pub form_field_keys: Vec<String>,
}

/// Port for fetching raw form definitions.
#[async_trait]
pub trait FormSource: Send + Sync {
    /// Fetches the raw customer-models response for one request type.
    async fn fetch_form(&self, reference: FormReference) -> AppResult<Value>;
}

/// Port for dynamic object-picker lookups.
#[async_trait]
pub trait AutocompleteLookup: Send + Sync {
    /// Returns candidates for an object-picker field in remote order.
    async fn lookup(&self, query: AutocompleteQuery) -> AppResult<Vec<OptionSummary>>;
}

/// Port for submitting a populated form.
#[async_trait]
pub trait RequestSubmitter: Send + Sync {
    /// Creates the request described by the payload.
    async fn submit(&self, payload: &SubmissionPayload) -> AppResult<CreateRequestResponse>;
}
