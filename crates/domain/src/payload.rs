use std::collections::BTreeMap;

use deskform_core::{AppError, AppResult};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{CoercedValue, FieldDescriptor, FieldKind, FieldValues, ParsedForm};

/// Value of one standard field in the submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// Text, option id or object reference.
    Single(String),
    /// Multi-select option ids.
    Multiple(Vec<String>),
    /// Cascading select emitted as one structured pair.
    Cascading(CascadingValue),
}

/// Parent and child option ids of a cascading select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadingValue {
    /// Option chosen on the parent field.
    pub parent_value: String,
    /// Option chosen on the child field, when one was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_value: Option<String>,
}

/// Answer to one proforma question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProformaAnswer {
    /// Choice answer referencing option ids.
    Choice {
        /// Always empty for choice answers.
        text: String,
        /// Chosen option ids.
        choices: Vec<String>,
    },
    /// Rich text answer as an Atlassian Document Format document.
    RichText {
        /// The ADF document.
        adf: Value,
    },
    /// Date-time answer split into its parts.
    DateTime {
        /// `YYYY-MM-DD` part.
        date: String,
        /// `HH:MM` part.
        time: String,
    },
    /// Plain text answer.
    Text {
        /// Answer text.
        text: String,
    },
}

/// The `proformaFormData` section of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProformaFormData {
    /// Template the answers belong to.
    pub template_form_id: Option<i64>,
    /// Answers keyed by proforma question id.
    pub answers: BTreeMap<String, ProformaAnswer>,
}

/// Wire payload for request creation.
///
/// Serializes to a flat `field key -> value` object, with cascading fields
/// as nested `{parentValue, childValue}` pairs and proforma answers under
/// `proformaFormData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    #[serde(skip)]
    portal_id: String,
    #[serde(skip)]
    request_type_id: String,
    #[serde(rename = "projectId", skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(rename = "atl_token", skip_serializing_if = "Option::is_none")]
    atl_token: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, PayloadValue>,
    #[serde(rename = "proformaFormData", skip_serializing_if = "Option::is_none")]
    proforma: Option<ProformaFormData>,
}

impl SubmissionPayload {
    /// Projects the coerced values of a form into the submission shape.
    ///
    /// Fails with [`AppError::IncompleteForm`] listing every required field
    /// without a value.
    pub fn build(form: &ParsedForm, values: &FieldValues) -> AppResult<Self> {
        let registry = form.registry();
        let missing: Vec<String> = registry
            .fields()
            .iter()
            .filter(|field| field.is_required() && !values.contains_key(field.key()))
            .filter(|field| !is_unreachable_child(form, values, field))
            .map(|field| field.label().to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::IncompleteForm(missing));
        }

        let mut fields = BTreeMap::new();
        let mut answers = BTreeMap::new();
        let mut has_proforma_fields = false;

        for field in registry.fields() {
            if field.kind() == FieldKind::ProformaCustom {
                has_proforma_fields = true;
            }

            let Some(value) = values.get(field.key()) else {
                continue;
            };

            match field.kind() {
                FieldKind::ProformaCustom => {
                    let question_id = field.proforma_question_id().unwrap_or(field.key());
                    answers.insert(question_id.to_owned(), proforma_answer(field, value));
                }
                FieldKind::SelectCascading if field.parent_key().is_some() => {}
                FieldKind::SelectCascading => {
                    let child_value = registry
                        .children_of(field.key())
                        .first()
                        .and_then(|child| values.get(child.key()))
                        .map(coerced_text);
                    fields.insert(
                        field.key().to_owned(),
                        PayloadValue::Cascading(CascadingValue {
                            parent_value: coerced_text(value),
                            child_value,
                        }),
                    );
                }
                _ => {
                    let payload_value = match value {
                        CoercedValue::OptionIds(ids) => PayloadValue::Multiple(ids.clone()),
                        other => PayloadValue::Single(coerced_text(other)),
                    };
                    fields.insert(field.key().to_owned(), payload_value);
                }
            }
        }

        let metadata = form.metadata();
        let proforma = (has_proforma_fields || metadata.proforma_template_id().is_some()).then(
            || ProformaFormData {
                template_form_id: metadata.proforma_template_id(),
                answers,
            },
        );

        Ok(Self {
            portal_id: metadata.portal_id().to_owned(),
            request_type_id: metadata.request_type_id().to_owned(),
            project_id: metadata.project_id().map(str::to_owned),
            atl_token: metadata.xsrf_token().map(str::to_owned),
            fields,
            proforma,
        })
    }

    /// Returns the portal the request is created in.
    #[must_use]
    pub fn portal_id(&self) -> &str {
        self.portal_id.as_str()
    }

    /// Returns the request type being created.
    #[must_use]
    pub fn request_type_id(&self) -> &str {
        self.request_type_id.as_str()
    }

    /// Returns the project id.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Returns the anti-forgery token.
    #[must_use]
    pub fn atl_token(&self) -> Option<&str> {
        self.atl_token.as_deref()
    }

    /// Returns standard field values keyed by field key.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, PayloadValue> {
        &self.fields
    }

    /// Returns the value emitted for one field key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.fields.get(key)
    }

    /// Returns the proforma section.
    #[must_use]
    pub fn proforma(&self) -> Option<&ProformaFormData> {
        self.proforma.as_ref()
    }

    /// Returns the JSON representation of the payload.
    pub fn to_json(&self) -> AppResult<Value> {
        serde_json::to_value(self).map_err(|error| {
            AppError::Internal(format!("failed to serialize submission payload: {error}"))
        })
    }
}

/// A child is not needed when the chosen parent option has no children.
fn is_unreachable_child(form: &ParsedForm, values: &FieldValues, field: &FieldDescriptor) -> bool {
    let Some(parent_key) = field.parent_key() else {
        return false;
    };
    let Some(parent_option_id) = values.get(parent_key).and_then(CoercedValue::as_option_id)
    else {
        return false;
    };

    form.registry().by_key(parent_key).is_some()
        && field.options_under(parent_option_id).next().is_none()
}

fn coerced_text(value: &CoercedValue) -> String {
    match value {
        CoercedValue::Text(text)
        | CoercedValue::OptionId(text)
        | CoercedValue::ObjectReference(text) => text.clone(),
        CoercedValue::OptionIds(ids) => ids.join(","),
    }
}

fn proforma_answer(field: &FieldDescriptor, value: &CoercedValue) -> ProformaAnswer {
    if let CoercedValue::OptionId(id) = value {
        return ProformaAnswer::Choice {
            text: String::new(),
            choices: vec![id.clone()],
        };
    }

    let text = coerced_text(value);
    match field.remote_type() {
        "rt" | "cd" => ProformaAnswer::RichText {
            adf: adf_document(text.as_str()),
        },
        "dt" => match text.split_once('T') {
            Some((date, time)) => ProformaAnswer::DateTime {
                date: date.to_owned(),
                time: time.to_owned(),
            },
            None => ProformaAnswer::Text { text },
        },
        _ => ProformaAnswer::Text { text },
    }
}

fn adf_document(text: &str) -> Value {
    json!({
        "version": 1,
        "type": "doc",
        "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": text}]}
        ],
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CascadingValue, PayloadValue, ProformaAnswer, SubmissionPayload};
    use crate::{
        CoercedValue, FieldDescriptor, FieldKind, FieldOption, FieldRegistry, FieldValues,
        FormMetadata, ParsedForm,
    };
    use deskform_core::AppError;

    fn option(id: &str, display_value: &str) -> FieldOption {
        FieldOption::new(id, display_value).unwrap_or_else(|_| unreachable!())
    }

    fn sample_form() -> ParsedForm {
        let summary = FieldDescriptor::new("summary", "Summary", FieldKind::Text, "text")
            .unwrap_or_else(|_| unreachable!())
            .required(true);
        let priority = FieldDescriptor::new("priority", "Priority", FieldKind::SelectSingle, "select")
            .unwrap_or_else(|_| unreachable!())
            .with_options(vec![option("1", "Low"), option("2", "Medium")]);
        let category = FieldDescriptor::new(
            "category",
            "Category",
            FieldKind::SelectCascading,
            "cascadingselect",
        )
        .unwrap_or_else(|_| unreachable!())
        .with_options(vec![option("10", "Hardware"), option("20", "Other")]);
        let subcategory = FieldDescriptor::new(
            "category:1",
            "Category (Subfield)",
            FieldKind::SelectCascading,
            "cascadingselect",
        )
        .and_then(|field| field.with_parent_key("category"))
        .unwrap_or_else(|_| unreachable!())
        .required(true)
        .with_options(vec![option("11", "Laptop").under_parent("10")]);
        let details = FieldDescriptor::new("description", "Details", FieldKind::ProformaCustom, "rt")
            .and_then(|field| field.with_proforma_question("7"))
            .unwrap_or_else(|_| unreachable!());

        let registry = FieldRegistry::new(vec![summary, priority, category, subcategory, details])
            .unwrap_or_else(|_| unreachable!());
        ParsedForm::new(
            FormMetadata::new("5", "42")
                .with_project_id("10001")
                .with_proforma_template(3),
            registry,
        )
    }

    #[test]
    fn missing_required_fields_are_reported_by_label() {
        let result = SubmissionPayload::build(&sample_form(), &FieldValues::new());
        assert!(matches!(
            result,
            Err(AppError::IncompleteForm(labels)) if labels == vec!["Summary".to_owned(), "Category (Subfield)".to_owned()]
        ));
    }

    #[test]
    fn cascading_fields_are_emitted_as_a_pair() {
        let values = FieldValues::from([
            ("summary".to_owned(), CoercedValue::Text("Broken".to_owned())),
            ("category".to_owned(), CoercedValue::OptionId("10".to_owned())),
            ("category:1".to_owned(), CoercedValue::OptionId("11".to_owned())),
        ]);

        let payload =
            SubmissionPayload::build(&sample_form(), &values).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            payload.get("category"),
            Some(&PayloadValue::Cascading(CascadingValue {
                parent_value: "10".to_owned(),
                child_value: Some("11".to_owned()),
            }))
        );
        assert!(payload.get("category:1").is_none());
    }

    #[test]
    fn childless_parent_option_satisfies_required_child() {
        let values = FieldValues::from([
            ("summary".to_owned(), CoercedValue::Text("Broken".to_owned())),
            ("category".to_owned(), CoercedValue::OptionId("20".to_owned())),
        ]);

        assert!(SubmissionPayload::build(&sample_form(), &values).is_ok());
    }

    #[test]
    fn proforma_rich_text_becomes_adf_and_json_shape_is_flat() {
        let values = FieldValues::from([
            ("summary".to_owned(), CoercedValue::Text("Broken".to_owned())),
            ("priority".to_owned(), CoercedValue::OptionId("2".to_owned())),
            ("category".to_owned(), CoercedValue::OptionId("20".to_owned())),
            ("description".to_owned(), CoercedValue::Text("It hums".to_owned())),
        ]);

        let payload =
            SubmissionPayload::build(&sample_form(), &values).unwrap_or_else(|_| unreachable!());
        let answer = payload
            .proforma()
            .and_then(|proforma| proforma.answers.get("7"));
        assert!(matches!(answer, Some(ProformaAnswer::RichText { .. })));

        let json = payload.to_json().unwrap_or_else(|_| unreachable!());
        assert_eq!(json["summary"], json!("Broken"));
        assert_eq!(json["priority"], json!("2"));
        assert_eq!(json["category"], json!({"parentValue": "20"}));
        assert_eq!(json["projectId"], json!("10001"));
        assert_eq!(json["proformaFormData"]["templateFormId"], json!(3));
        assert_eq!(
            json["proformaFormData"]["answers"]["7"]["adf"]["content"][0]["content"][0]["text"],
            json!("It hums")
        );
    }

    #[test]
    fn proforma_answers_follow_question_type() {
        let question = |key: &str, label: &str, remote_type: &str| {
            FieldDescriptor::new(key, label, FieldKind::ProformaCustom, remote_type)
                .and_then(|field| field.with_proforma_question(key))
                .unwrap_or_else(|_| unreachable!())
        };
        let registry = FieldRegistry::new(vec![
            question("2", "Start", "dt"),
            question("9", "Team", "cl").with_options(vec![option("1", "Ops"), option("2", "Dev")]),
            question("4", "Notes", "tl"),
        ])
        .unwrap_or_else(|_| unreachable!());
        let form = ParsedForm::new(FormMetadata::new("5", "42").with_proforma_template(3), registry);

        let values = FieldValues::from([
            ("2".to_owned(), CoercedValue::Text("2024-05-01T09:30".to_owned())),
            ("9".to_owned(), CoercedValue::OptionId("1".to_owned())),
            ("4".to_owned(), CoercedValue::Text("Night shift".to_owned())),
        ]);

        let payload = SubmissionPayload::build(&form, &values).unwrap_or_else(|_| unreachable!());
        let answers = payload.proforma().map(|proforma| &proforma.answers);
        assert_eq!(
            answers.and_then(|answers| answers.get("2")),
            Some(&ProformaAnswer::DateTime {
                date: "2024-05-01".to_owned(),
                time: "09:30".to_owned(),
            })
        );

        let json = payload.to_json().unwrap_or_else(|_| unreachable!());
        assert_eq!(
            json["proformaFormData"]["answers"],
            json!({
                "2": {"date": "2024-05-01", "time": "09:30"},
                "9": {"text": "", "choices": ["1"]},
                "4": {"text": "Night shift"}
            })
        );
    }
}
