//! Domain entities and invariants of the Service Desk request form.

#![forbid(unsafe_code)]

mod coercion;
mod field;
mod form;
mod payload;
mod registry;
mod response;
mod summary;

pub use coercion::{
    CoercedValue, FieldValues, OptionMatchPolicy, PROFORMA_DATE_TIME_FORMAT, ValueCoercer,
};
pub use field::{FieldDescriptor, FieldKind, FieldOption};
pub use form::{CASCADING_CHILD_LABEL_SUFFIX, FormMetadata, ParsedForm};
pub use payload::{
    CascadingValue, PayloadValue, ProformaAnswer, ProformaFormData, SubmissionPayload,
};
pub use registry::FieldRegistry;
pub use response::{CreateRequestResponse, Issue, IssueField, Reporter};
pub use summary::{
    FieldSummary, FormSummary, OptionSummary, RequestTypeSummary, ServiceDeskSummary,
};
