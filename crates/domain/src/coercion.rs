use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use deskform_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::match_option;
use crate::{FieldDescriptor, FieldKind};

/// Proforma date-time answers use minute precision.
pub const PROFORMA_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// How caller-supplied text is compared with option display values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMatchPolicy {
    /// Compare display values case-sensitively.
    pub case_sensitive: bool,
    /// Trim surrounding whitespace from the caller's value before comparing.
    pub trim_whitespace: bool,
}

impl Default for OptionMatchPolicy {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            trim_whitespace: false,
        }
    }
}

impl OptionMatchPolicy {
    /// Returns whether an option display value matches the raw input.
    #[must_use]
    pub fn matches(&self, display_value: &str, raw: &str) -> bool {
        let raw = self.normalize_id(raw);
        if self.case_sensitive {
            display_value == raw
        } else {
            display_value.to_lowercase() == raw.to_lowercase()
        }
    }

    /// Applies whitespace trimming to an option identifier.
    #[must_use]
    pub fn normalize_id<'a>(&self, raw: &'a str) -> &'a str {
        if self.trim_whitespace { raw.trim() } else { raw }
    }
}

/// Internal representation of a field value after coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CoercedValue {
    /// Plain string value.
    Text(String),
    /// Identifier of one chosen option.
    OptionId(String),
    /// Identifiers of every chosen option, in input order.
    OptionIds(Vec<String>),
    /// External catalog object identifier.
    ObjectReference(String),
}

impl CoercedValue {
    /// Returns the chosen option id for single-choice values.
    #[must_use]
    pub fn as_option_id(&self) -> Option<&str> {
        match self {
            Self::OptionId(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

/// Coerced values keyed by field key.
pub type FieldValues = BTreeMap<String, CoercedValue>;

/// Per-kind strategy converting raw caller input into coerced values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueCoercer {
    policy: OptionMatchPolicy,
}

impl ValueCoercer {
    /// Creates a coercer using the given option matching policy.
    #[must_use]
    pub fn new(policy: OptionMatchPolicy) -> Self {
        Self { policy }
    }

    /// Returns the option matching policy.
    #[must_use]
    pub fn policy(&self) -> OptionMatchPolicy {
        self.policy
    }

    /// Coerces one raw value for a field.
    ///
    /// `values` is consulted only by cascading children, which need the
    /// option already chosen for their parent.
    pub fn coerce(
        &self,
        descriptor: &FieldDescriptor,
        raw: &Value,
        values: &FieldValues,
    ) -> AppResult<CoercedValue> {
        match descriptor.kind() {
            FieldKind::Text => self.coerce_text(descriptor, raw),
            FieldKind::SelectSingle => self.coerce_single(descriptor, raw),
            FieldKind::SelectMulti => self.coerce_multi(descriptor, raw),
            FieldKind::SelectCascading => self.coerce_cascading(descriptor, raw, values),
            FieldKind::ObjectPicker => self.coerce_object_reference(descriptor, raw),
            FieldKind::ProformaCustom => self.coerce_proforma(descriptor, raw),
        }
    }

    fn coerce_text(&self, descriptor: &FieldDescriptor, raw: &Value) -> AppResult<CoercedValue> {
        scalar_text(raw).map(CoercedValue::Text).ok_or_else(|| {
            AppError::Validation(format!(
                "field '{}' expects a text value",
                descriptor.label()
            ))
        })
    }

    fn coerce_single(&self, descriptor: &FieldDescriptor, raw: &Value) -> AppResult<CoercedValue> {
        let text = self.expect_scalar(descriptor, raw)?;
        match_option(descriptor.options(), text.as_str(), self.policy)
            .map(|option| CoercedValue::OptionId(option.id().to_owned()))
            .ok_or_else(|| invalid_option(descriptor, text))
    }

    fn coerce_multi(&self, descriptor: &FieldDescriptor, raw: &Value) -> AppResult<CoercedValue> {
        let items: Vec<&Value> = match raw {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut ids: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let text = self.expect_scalar(descriptor, item)?;
            let option = match_option(descriptor.options(), text.as_str(), self.policy)
                .ok_or_else(|| invalid_option(descriptor, text.clone()))?;
            if !ids.iter().any(|id| id == option.id()) {
                ids.push(option.id().to_owned());
            }
        }

        Ok(CoercedValue::OptionIds(ids))
    }

    fn coerce_cascading(
        &self,
        descriptor: &FieldDescriptor,
        raw: &Value,
        values: &FieldValues,
    ) -> AppResult<CoercedValue> {
        let Some(parent_key) = descriptor.parent_key() else {
            return self.coerce_single(descriptor, raw);
        };

        let parent_option_id = values
            .get(parent_key)
            .and_then(CoercedValue::as_option_id)
            .ok_or_else(|| AppError::MissingParentValue {
                field: descriptor.label().to_owned(),
                parent: parent_key.to_owned(),
            })?;

        let text = self.expect_scalar(descriptor, raw)?;
        match_option(
            descriptor.options_under(parent_option_id),
            text.as_str(),
            self.policy,
        )
        .map(|option| CoercedValue::OptionId(option.id().to_owned()))
        .ok_or_else(|| invalid_option(descriptor, text))
    }

    fn coerce_object_reference(
        &self,
        descriptor: &FieldDescriptor,
        raw: &Value,
    ) -> AppResult<CoercedValue> {
        self.expect_scalar(descriptor, raw)
            .map(CoercedValue::ObjectReference)
    }

    fn coerce_proforma(
        &self,
        descriptor: &FieldDescriptor,
        raw: &Value,
    ) -> AppResult<CoercedValue> {
        if !descriptor.options().is_empty() {
            return self.coerce_single(descriptor, raw);
        }

        let coerced = self.coerce_text(descriptor, raw)?;
        if descriptor.remote_type() == "dt" {
            if let CoercedValue::Text(text) = &coerced {
                NaiveDateTime::parse_from_str(text, PROFORMA_DATE_TIME_FORMAT).map_err(|_| {
                    AppError::Validation(format!(
                        "invalid date-time value '{}' for field '{}', expected YYYY-MM-DDTHH:MM",
                        text,
                        descriptor.label()
                    ))
                })?;
            }
        }

        Ok(coerced)
    }

    fn expect_scalar(&self, descriptor: &FieldDescriptor, raw: &Value) -> AppResult<String> {
        scalar_text(raw).ok_or_else(|| {
            AppError::Validation(format!(
                "field '{}' expects a single string value",
                descriptor.label()
            ))
        })
    }
}

fn scalar_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn invalid_option(descriptor: &FieldDescriptor, value: String) -> AppError {
    AppError::InvalidOption {
        field: descriptor.label().to_owned(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CoercedValue, FieldValues, OptionMatchPolicy, ValueCoercer};
    use crate::{FieldDescriptor, FieldKind, FieldOption};
    use deskform_core::AppError;

    fn option(id: &str, display_value: &str) -> FieldOption {
        FieldOption::new(id, display_value).unwrap_or_else(|_| unreachable!())
    }

    fn priority() -> FieldDescriptor {
        FieldDescriptor::new("priority", "Priority", FieldKind::SelectSingle, "select")
            .unwrap_or_else(|_| unreachable!())
            .with_options(vec![
                option("1", "Low"),
                option("2", "Medium"),
                option("3", "High"),
            ])
    }

    fn category_child() -> FieldDescriptor {
        FieldDescriptor::new(
            "category:1",
            "Category (Subfield)",
            FieldKind::SelectCascading,
            "cascadingselect",
        )
        .and_then(|field| field.with_parent_key("category"))
        .unwrap_or_else(|_| unreachable!())
        .with_options(vec![
            option("11", "Laptop").under_parent("10"),
            option("12", "Desktop").under_parent("10"),
            option("21", "Phone").under_parent("20"),
        ])
    }

    #[test]
    fn select_matches_display_value_then_id() {
        let coercer = ValueCoercer::default();
        let values = FieldValues::new();

        let by_label = coercer.coerce(&priority(), &json!("Medium"), &values);
        assert_eq!(
            by_label.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionId("2".to_owned())
        );

        let by_id = coercer.coerce(&priority(), &json!("3"), &values);
        assert_eq!(
            by_id.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionId("3".to_owned())
        );
    }

    #[test]
    fn select_rejects_unknown_option() {
        let coercer = ValueCoercer::default();
        let result = coercer.coerce(&priority(), &json!("Urgent"), &FieldValues::new());
        assert!(matches!(result, Err(AppError::InvalidOption { .. })));
    }

    #[test]
    fn exact_matching_is_the_default() {
        let result =
            ValueCoercer::default().coerce(&priority(), &json!(" medium "), &FieldValues::new());
        assert!(result.is_err());

        let relaxed = ValueCoercer::new(OptionMatchPolicy {
            case_sensitive: false,
            trim_whitespace: true,
        });
        let result = relaxed.coerce(&priority(), &json!(" medium "), &FieldValues::new());
        assert_eq!(
            result.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionId("2".to_owned())
        );
    }

    #[test]
    fn trimming_alone_keeps_case_sensitivity() {
        let trim_only = ValueCoercer::new(OptionMatchPolicy {
            case_sensitive: true,
            trim_whitespace: true,
        });

        let padded = trim_only.coerce(&priority(), &json!(" Medium "), &FieldValues::new());
        assert_eq!(
            padded.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionId("2".to_owned())
        );

        let padded_id = trim_only.coerce(&priority(), &json!(" 3\t"), &FieldValues::new());
        assert_eq!(
            padded_id.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionId("3".to_owned())
        );

        let lowercase = trim_only.coerce(&priority(), &json!(" medium "), &FieldValues::new());
        assert!(matches!(
            lowercase,
            Err(AppError::InvalidOption { value, .. }) if value == " medium "
        ));
    }

    #[test]
    fn multi_select_collects_unique_ids() {
        let field = FieldDescriptor::new("labels", "Labels", FieldKind::SelectMulti, "multiselect")
            .unwrap_or_else(|_| unreachable!())
            .with_options(vec![option("a", "Alpha"), option("b", "Beta")]);

        let result = ValueCoercer::default().coerce(
            &field,
            &json!(["Beta", "Alpha", "b"]),
            &FieldValues::new(),
        );
        assert_eq!(
            result.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionIds(vec!["b".to_owned(), "a".to_owned()])
        );
    }

    #[test]
    fn cascading_child_requires_parent_value() {
        let result =
            ValueCoercer::default().coerce(&category_child(), &json!("Laptop"), &FieldValues::new());
        assert!(matches!(result, Err(AppError::MissingParentValue { .. })));
    }

    #[test]
    fn cascading_child_is_limited_to_parent_subset() {
        let values = FieldValues::from([(
            "category".to_owned(),
            CoercedValue::OptionId("10".to_owned()),
        )]);
        let coercer = ValueCoercer::default();

        let laptop = coercer.coerce(&category_child(), &json!("Laptop"), &values);
        assert_eq!(
            laptop.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionId("11".to_owned())
        );

        let phone = coercer.coerce(&category_child(), &json!("Phone"), &values);
        assert!(matches!(phone, Err(AppError::InvalidOption { .. })));
    }

    #[test]
    fn object_picker_passes_identifier_through() {
        let field = FieldDescriptor::new(
            "customfield_10200",
            "Asset",
            FieldKind::ObjectPicker,
            "cmdbobjectpicker",
        )
        .unwrap_or_else(|_| unreachable!());

        let coercer = ValueCoercer::default();
        let result = coercer.coerce(&field, &json!("ASSET-42"), &FieldValues::new());
        assert_eq!(
            result.unwrap_or_else(|_| unreachable!()),
            CoercedValue::ObjectReference("ASSET-42".to_owned())
        );

        let blank = coercer.coerce(&field, &json!(""), &FieldValues::new());
        assert_eq!(
            blank.unwrap_or_else(|_| unreachable!()),
            CoercedValue::ObjectReference(String::new())
        );
        assert!(coercer.coerce(&field, &json!(["ASSET-42"]), &FieldValues::new()).is_err());
    }

    #[test]
    fn proforma_date_time_is_validated() {
        let field = FieldDescriptor::new("q3", "Start", FieldKind::ProformaCustom, "dt")
            .unwrap_or_else(|_| unreachable!());
        let coercer = ValueCoercer::default();

        assert!(
            coercer
                .coerce(&field, &json!("2024-05-01T09:30"), &FieldValues::new())
                .is_ok()
        );
        assert!(
            coercer
                .coerce(&field, &json!("tomorrow"), &FieldValues::new())
                .is_err()
        );
    }

    #[test]
    fn proforma_with_options_behaves_as_select() {
        let field = FieldDescriptor::new("q4", "Team", FieldKind::ProformaCustom, "cl")
            .unwrap_or_else(|_| unreachable!())
            .with_options(vec![option("1", "Ops"), option("2", "Dev")]);

        let result = ValueCoercer::default().coerce(&field, &json!("Dev"), &FieldValues::new());
        assert_eq!(
            result.unwrap_or_else(|_| unreachable!()),
            CoercedValue::OptionId("2".to_owned())
        );
    }

    #[test]
    fn text_rejects_structured_values() {
        let field = FieldDescriptor::new("summary", "Summary", FieldKind::Text, "text")
            .unwrap_or_else(|_| unreachable!());
        let result = ValueCoercer::default().coerce(&field, &json!({"a": 1}), &FieldValues::new());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
