use std::collections::BTreeSet;
use std::sync::Arc;

use deskform_core::{AppError, AppResult};
use deskform_domain::{
    CoercedValue, CreateRequestResponse, FieldDescriptor, FieldKind, FieldOption, FieldSummary,
    FieldValues, OptionMatchPolicy, OptionSummary, ParsedForm, SubmissionPayload, ValueCoercer,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::form_ports::{
    AutocompleteLookup, AutocompleteQuery, FormReference, FormSource, RequestSubmitter,
};

mod batch;
mod listing;


/// Populates one request-creation form and turns it into a submission.
///
/// Not safe for concurrent mutation; callers sharing a model across tasks
/// must wrap it in a lock.
pub struct FormModel {
    form_source: Arc<dyn FormSource>,
    autocomplete: Arc<dyn AutocompleteLookup>,
    submitter: Arc<dyn RequestSubmitter>,
    coercer: ValueCoercer,
    form: Option<ParsedForm>,
    values: FieldValues,
}

impl FormModel {
    /// Creates an empty model wired to its external collaborators.
    #[must_use]
    pub fn new(
        form_source: Arc<dyn FormSource>,
        autocomplete: Arc<dyn AutocompleteLookup>,
        submitter: Arc<dyn RequestSubmitter>,
        policy: OptionMatchPolicy,
    ) -> Self {
        Self {
            form_source,
            autocomplete,
            submitter,
            coercer: ValueCoercer::new(policy),
            form: None,
            values: FieldValues::new(),
        }
    }

    /// Fetches and parses a form, replacing any previous form and values.
    ///
    /// On failure the model keeps whatever it held before the call.
    pub async fn fetch_and_parse_form(
        &mut self,
        reference: FormReference,
    ) -> AppResult<&ParsedForm> {
        let raw = self.form_source.fetch_form(reference).await?;
        let form = ParsedForm::parse(&raw)?;

        info!(
            %reference,
            form_name = %form.metadata().form_name(),
            field_count = form.registry().len(),
            "form fetched and parsed"
        );
        if form.registry().is_empty() {
            warn!(%reference, "form has no fields");
        }

        self.values.clear();
        Ok(self.form.insert(form))
    }

    /// Returns the parsed form.
    pub fn form(&self) -> AppResult<&ParsedForm> {
        self.form.as_ref().ok_or(AppError::FormNotFetched)
    }

    /// Returns coerced values keyed by field key.
    #[must_use]
    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Returns the coerced value of a field, if set.
    pub fn value_of(&self, label_or_key: &str) -> AppResult<Option<&CoercedValue>> {
        let field = self.form()?.registry().resolve(label_or_key)?;
        Ok(self.values.get(field.key()))
    }

    /// Applies a batch of `label -> raw value` pairs.
    ///
    /// The batch is all-or-nothing: on the first failure the value map is
    /// left exactly as it was before the call.
    pub fn set_form_values<I, K>(&mut self, entries: I) -> AppResult<&mut Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let form = self.form.as_ref().ok_or(AppError::FormNotFetched)?;
        let staged = batch::apply(form, &self.coercer, &self.values, entries)?;

        info!(field_count = staged.len(), "form values applied");

        self.values = staged;
        Ok(self)
    }

    /// Projects the current values into the submission payload.
    pub fn serialize(&self) -> AppResult<SubmissionPayload> {
        SubmissionPayload::build(self.form()?, &self.values)
    }

    /// Serializes the form and hands it to the request submitter.
    pub async fn create_request(&self) -> AppResult<CreateRequestResponse> {
        let payload = self.serialize()?;
        debug!(
            portal_id = %payload.portal_id(),
            request_type_id = %payload.request_type_id(),
            field_count = payload.fields().len(),
            "submitting request"
        );

        let response = self.submitter.submit(&payload).await?;
        info!(request_key = %response.key, "request created");
        Ok(response)
    }
}
