use std::str::FromStr;

use deskform_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::OptionMatchPolicy;

/// Field taxonomy supported by the request-creation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, including textarea and unrecognised standard types.
    Text,
    /// Single choice out of the field's options.
    SelectSingle,
    /// Any number of choices out of the field's options.
    SelectMulti,
    /// Parent or child half of a cascading select pair.
    SelectCascading,
    /// Autocomplete field whose values live in an external catalog.
    ObjectPicker,
    /// Question defined by the proforma forms add-on.
    ProformaCustom,
}

impl FieldKind {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::SelectSingle => "select_single",
            Self::SelectMulti => "select_multi",
            Self::SelectCascading => "select_cascading",
            Self::ObjectPicker => "object_picker",
            Self::ProformaCustom => "proforma_custom",
        }
    }

    /// Maps the remote `fieldType` of a standard field to a kind.
    #[must_use]
    pub fn from_remote_type(remote_type: &str, has_autocomplete: bool) -> Self {
        if has_autocomplete {
            return Self::ObjectPicker;
        }

        match remote_type {
            "cascadingselect" => Self::SelectCascading,
            "select" | "radiobuttons" => Self::SelectSingle,
            "multiselect" | "checkbox" => Self::SelectMulti,
            _ => Self::Text,
        }
    }
}

impl FromStr for FieldKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "select_single" => Ok(Self::SelectSingle),
            "select_multi" => Ok(Self::SelectMulti),
            "select_cascading" => Ok(Self::SelectCascading),
            "object_picker" => Ok(Self::ObjectPicker),
            "proforma_custom" => Ok(Self::ProformaCustom),
            _ => Err(AppError::Validation(format!("unknown field kind '{value}'"))),
        }
    }
}

/// One selectable option of a select-like field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    id: NonEmptyString,
    display_value: String,
    parent_option_id: Option<String>,
    children: Vec<FieldOption>,
}

impl FieldOption {
    /// Creates a validated option.
    pub fn new(id: impl Into<String>, display_value: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id: NonEmptyString::new(id)?,
            display_value: display_value.into(),
            parent_option_id: None,
            children: Vec::new(),
        })
    }

    /// Attaches the options that become valid once this option is chosen.
    #[must_use]
    pub fn with_children(mut self, children: Vec<FieldOption>) -> Self {
        self.children = children;
        self
    }

    /// Marks this option as valid only under the given parent option.
    #[must_use]
    pub fn under_parent(mut self, parent_option_id: impl Into<String>) -> Self {
        self.parent_option_id = Some(parent_option_id.into());
        self
    }

    /// Returns the remote option identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the human-readable value.
    #[must_use]
    pub fn display_value(&self) -> &str {
        self.display_value.as_str()
    }

    /// Returns the parent option this option cascades from.
    #[must_use]
    pub fn parent_option_id(&self) -> Option<&str> {
        self.parent_option_id.as_deref()
    }

    /// Returns dependent options.
    #[must_use]
    pub fn children(&self) -> &[FieldOption] {
        &self.children
    }
}

/// Finds an option by display value first, then by identifier.
pub(crate) fn match_option<'a, I>(
    options: I,
    raw: &str,
    policy: OptionMatchPolicy,
) -> Option<&'a FieldOption>
where
    I: IntoIterator<Item = &'a FieldOption>,
    I::IntoIter: Clone,
{
    let options = options.into_iter();
    options
        .clone()
        .find(|option| policy.matches(option.display_value(), raw))
        .or_else(|| {
            let raw = policy.normalize_id(raw);
            options
                .clone()
                .find(|option| option.id() == raw)
        })
}

/// Immutable description of one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    key: NonEmptyString,
    label: NonEmptyString,
    kind: FieldKind,
    remote_type: String,
    description: String,
    required: bool,
    displayed: bool,
    options: Vec<FieldOption>,
    parent_key: Option<NonEmptyString>,
    proforma_question_id: Option<NonEmptyString>,
}

impl FieldDescriptor {
    /// Creates a displayed, optional descriptor without options.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
        remote_type: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            key: NonEmptyString::new(key)?,
            label: NonEmptyString::new(label)?,
            kind,
            remote_type: remote_type.into(),
            description: String::new(),
            required: false,
            displayed: true,
            options: Vec::new(),
            parent_key: None,
            proforma_question_id: None,
        })
    }

    /// Sets whether the field must be filled before submission.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets whether the portal displays the field.
    #[must_use]
    pub fn displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Sets the plain-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the ordered option list.
    #[must_use]
    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    /// Links a cascading child to its parent field.
    pub fn with_parent_key(mut self, parent_key: impl Into<String>) -> AppResult<Self> {
        if self.kind != FieldKind::SelectCascading {
            return Err(AppError::Validation(format!(
                "field '{}' of kind '{}' cannot depend on a parent field",
                self.key,
                self.kind.as_str()
            )));
        }

        self.parent_key = Some(NonEmptyString::new(parent_key)?);
        Ok(self)
    }

    /// Records the proforma question backing this field.
    pub fn with_proforma_question(mut self, question_id: impl Into<String>) -> AppResult<Self> {
        if self.kind != FieldKind::ProformaCustom {
            return Err(AppError::Validation(format!(
                "field '{}' of kind '{}' cannot carry a proforma question",
                self.key,
                self.kind.as_str()
            )));
        }

        self.proforma_question_id = Some(NonEmptyString::new(question_id)?);
        Ok(self)
    }

    /// Returns the stable field key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the field kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns the `fieldType` string as sent by the remote service.
    #[must_use]
    pub fn remote_type(&self) -> &str {
        self.remote_type.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns whether the field is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether the field is displayed.
    #[must_use]
    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// Returns options in form order.
    #[must_use]
    pub fn options(&self) -> &[FieldOption] {
        &self.options
    }

    /// Returns the parent key of a cascading child.
    #[must_use]
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_ref().map(NonEmptyString::as_str)
    }

    /// Returns the proforma question id.
    #[must_use]
    pub fn proforma_question_id(&self) -> Option<&str> {
        self.proforma_question_id.as_ref().map(NonEmptyString::as_str)
    }

    /// Returns options valid under the given parent option.
    pub fn options_under<'a>(
        &'a self,
        parent_option_id: &'a str,
    ) -> impl Iterator<Item = &'a FieldOption> + Clone + 'a {
        self.options
            .iter()
            .filter(move |option| option.parent_option_id() == Some(parent_option_id))
    }

    /// Returns the option with the given id.
    #[must_use]
    pub fn option_by_id(&self, id: &str) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldDescriptor, FieldKind, FieldOption};

    #[test]
    fn remote_types_map_to_kinds() {
        assert_eq!(
            FieldKind::from_remote_type("cascadingselect", false),
            FieldKind::SelectCascading
        );
        assert_eq!(
            FieldKind::from_remote_type("radiobuttons", false),
            FieldKind::SelectSingle
        );
        assert_eq!(
            FieldKind::from_remote_type("checkbox", false),
            FieldKind::SelectMulti
        );
        assert_eq!(
            FieldKind::from_remote_type("cmdbobjectpicker", true),
            FieldKind::ObjectPicker
        );
        assert_eq!(
            FieldKind::from_remote_type("textarea", false),
            FieldKind::Text
        );
    }

    #[test]
    fn kind_names_parse_back_to_kinds() {
        assert_eq!(
            FieldKind::SelectCascading.as_str().parse::<FieldKind>().ok(),
            Some(FieldKind::SelectCascading)
        );
        assert_eq!(
            "object_picker".parse::<FieldKind>().ok(),
            Some(FieldKind::ObjectPicker)
        );
        assert!("dropdown".parse::<FieldKind>().is_err());
    }

    #[test]
    fn only_cascading_fields_accept_a_parent() {
        let result = FieldDescriptor::new("summary", "Summary", FieldKind::Text, "text")
            .and_then(|field| field.with_parent_key("category"));
        assert!(result.is_err());
    }

    #[test]
    fn options_under_filters_by_parent_option() {
        let laptop = FieldOption::new("11", "Laptop").map(|option| option.under_parent("1"));
        let word = FieldOption::new("21", "Word").map(|option| option.under_parent("2"));
        let child = FieldDescriptor::new(
            "category:1",
            "Category (Subfield)",
            FieldKind::SelectCascading,
            "cascadingselect",
        )
        .map(|field| {
            field.with_options(vec![
                laptop.unwrap_or_else(|_| unreachable!()),
                word.unwrap_or_else(|_| unreachable!()),
            ])
        })
        .unwrap_or_else(|_| unreachable!());

        let under_hardware: Vec<&str> = child.options_under("1").map(FieldOption::id).collect();
        assert_eq!(under_hardware, vec!["11"]);
    }
}
