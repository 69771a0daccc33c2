//! Shared primitives for all Rust crates in Deskform.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Deskform crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Raw form definition is structurally invalid.
    #[error("parse error: {0}")]
    Parse(String),

    /// Caller referenced a field label or key that is not in the form.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Supplied value matches none of the options allowed for the field.
    #[error("invalid option '{value}' for field '{field}'")]
    InvalidOption {
        /// Label of the field being set.
        field: String,
        /// Raw value as supplied by the caller.
        value: String,
    },

    /// Cascading child supplied without a value for its parent.
    #[error("field '{field}' requires a value for parent field '{parent}'")]
    MissingParentValue {
        /// Label of the child field.
        field: String,
        /// Key of the parent field.
        parent: String,
    },

    /// Required fields have no value at serialization time.
    #[error("missing required fields: {}", .0.join(", "))]
    IncompleteForm(Vec<String>),

    /// A form operation was attempted before any form was fetched.
    #[error("form has not been fetched and parsed; run fetch_and_parse_form first")]
    FormNotFetched,

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote service rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Remote service could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote service answered with an unexpected status.
    #[error("remote service returned status {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body, or a placeholder when unreadable.
        body: String,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn incomplete_form_lists_every_missing_label() {
        let error = AppError::IncompleteForm(vec!["Summary".to_owned(), "Priority".to_owned()]);
        assert_eq!(
            error.to_string(),
            "missing required fields: Summary, Priority"
        );
    }
}
