//! Raw customer-models parsing into a [`ParsedForm`].
//!
//! Only the attributes the form model needs are read; everything else in the
//! remote response is ignored.

use deskform_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FieldDescriptor, FieldKind, FieldOption, FieldRegistry};

/// Label suffix given to the synthesized child of a cascading select.
pub const CASCADING_CHILD_LABEL_SUFFIX: &str = " (Subfield)";

/// Form-level identity needed to address and submit a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormMetadata {
    portal_id: String,
    request_type_id: String,
    service_desk_id: Option<String>,
    project_id: Option<String>,
    portal_name: String,
    portal_description: String,
    form_name: String,
    form_description_html: String,
    proforma_template_id: Option<i64>,
    proforma_template_uuid: Option<String>,
    updated_at: Option<String>,
    xsrf_token: Option<String>,
}

impl FormMetadata {
    /// Creates metadata addressing one portal request type.
    #[must_use]
    pub fn new(portal_id: impl Into<String>, request_type_id: impl Into<String>) -> Self {
        Self {
            portal_id: portal_id.into(),
            request_type_id: request_type_id.into(),
            service_desk_id: None,
            project_id: None,
            portal_name: String::new(),
            portal_description: String::new(),
            form_name: String::new(),
            form_description_html: String::new(),
            proforma_template_id: None,
            proforma_template_uuid: None,
            updated_at: None,
            xsrf_token: None,
        }
    }

    /// Sets the Jira project id sent along with submissions.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the proforma template the answers belong to.
    #[must_use]
    pub fn with_proforma_template(mut self, template_id: i64) -> Self {
        self.proforma_template_id = Some(template_id);
        self
    }

    /// Returns the portal id.
    #[must_use]
    pub fn portal_id(&self) -> &str {
        self.portal_id.as_str()
    }

    /// Returns the request type id.
    #[must_use]
    pub fn request_type_id(&self) -> &str {
        self.request_type_id.as_str()
    }

    /// Returns the service desk id.
    #[must_use]
    pub fn service_desk_id(&self) -> Option<&str> {
        self.service_desk_id.as_deref()
    }

    /// Returns the project id.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Returns the portal name.
    #[must_use]
    pub fn portal_name(&self) -> &str {
        self.portal_name.as_str()
    }

    /// Returns the portal description.
    #[must_use]
    pub fn portal_description(&self) -> &str {
        self.portal_description.as_str()
    }

    /// Returns the form name.
    #[must_use]
    pub fn form_name(&self) -> &str {
        self.form_name.as_str()
    }

    /// Returns the HTML form description.
    #[must_use]
    pub fn form_description_html(&self) -> &str {
        self.form_description_html.as_str()
    }

    /// Returns the proforma template id.
    #[must_use]
    pub fn proforma_template_id(&self) -> Option<i64> {
        self.proforma_template_id
    }

    /// Returns the proforma template form uuid.
    #[must_use]
    pub fn proforma_template_uuid(&self) -> Option<&str> {
        self.proforma_template_uuid.as_deref()
    }

    /// Returns the proforma template last-update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    /// Returns the anti-forgery token handed out with the form.
    #[must_use]
    pub fn xsrf_token(&self) -> Option<&str> {
        self.xsrf_token.as_deref()
    }
}

/// A fetched form: its metadata plus the field registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedForm {
    metadata: FormMetadata,
    registry: FieldRegistry,
}

impl ParsedForm {
    /// Combines metadata with an already built registry.
    #[must_use]
    pub fn new(metadata: FormMetadata, registry: FieldRegistry) -> Self {
        Self { metadata, registry }
    }

    /// Parses a raw customer-models response.
    pub fn parse(raw: &Value) -> AppResult<Self> {
        let models: RawCustomerModels = from_raw(raw.clone(), "form definition")?;
        let portal = models
            .portal
            .ok_or_else(|| AppError::Parse("form definition is missing 'portal'".to_owned()))?;
        let req_create = models
            .req_create
            .ok_or_else(|| AppError::Parse("form definition is missing 'reqCreate'".to_owned()))?;

        let portal_id = identity(portal.id.as_ref())
            .ok_or_else(|| AppError::Parse("portal is missing 'id'".to_owned()))?;
        let request_type_id = identity(req_create.id.as_ref())
            .ok_or_else(|| AppError::Parse("reqCreate is missing 'id'".to_owned()))?;

        let mut fields = Vec::with_capacity(req_create.fields.len());
        for (index, raw_field) in req_create.fields.into_iter().enumerate() {
            fields.extend(parse_standard_field(index, raw_field)?);
        }

        let template = req_create.proforma_template_form.unwrap_or_default();
        fields.extend(parse_proforma_fields(&template)?);

        let registry = FieldRegistry::new(fields)?;
        let form = req_create.form.unwrap_or_default();
        let metadata = FormMetadata {
            portal_id,
            request_type_id,
            service_desk_id: identity(portal.service_desk_id.as_ref()),
            project_id: identity(portal.project_id.as_ref()),
            portal_name: portal.name.unwrap_or_default(),
            portal_description: portal.description.unwrap_or_default(),
            form_name: form.name.unwrap_or_default(),
            form_description_html: form.description_html.unwrap_or_default(),
            proforma_template_id: template
                .design
                .settings
                .template_id
                .as_ref()
                .and_then(integer),
            proforma_template_uuid: template.design.settings.template_form_uuid,
            updated_at: template.updated,
            xsrf_token: models.xsrf_token,
        };

        Ok(Self { metadata, registry })
    }

    /// Returns form metadata.
    #[must_use]
    pub fn metadata(&self) -> &FormMetadata {
        &self.metadata
    }

    /// Returns the field registry.
    #[must_use]
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }
}

impl FieldRegistry {
    /// Parses a raw customer-models response, keeping only the fields.
    pub fn parse(raw: &Value) -> AppResult<Self> {
        ParsedForm::parse(raw).map(|form| form.registry)
    }
}

fn parse_standard_field(index: usize, raw: RawField) -> AppResult<Vec<FieldDescriptor>> {
    let key = raw
        .field_id
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Parse(format!("field #{index} is missing 'fieldId'")))?;
    let label = raw
        .label
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Parse(format!("field '{key}' is missing 'label'")))?;
    let remote_type = raw
        .field_type
        .ok_or_else(|| AppError::Parse(format!("field '{key}' is missing 'fieldType'")))?;

    let has_autocomplete = raw
        .auto_complete_url
        .as_deref()
        .is_some_and(|url| !url.is_empty());
    let kind = FieldKind::from_remote_type(remote_type.as_str(), has_autocomplete);
    let options = parse_values(&key, raw.values)?;
    let description = raw.description.unwrap_or_default();

    let parent = FieldDescriptor::new(key.as_str(), label.as_str(), kind, remote_type.as_str())
        .map_err(|error| AppError::Parse(format!("field '{key}': {error}")))?
        .required(raw.required)
        .displayed(raw.displayed)
        .with_description(description.as_str());

    if kind != FieldKind::SelectCascading || options.is_empty() {
        return Ok(vec![parent.with_options(options)]);
    }

    let child_options: Vec<FieldOption> = options
        .iter()
        .flat_map(|option| {
            option
                .children()
                .iter()
                .map(|child| child.clone().under_parent(option.id()))
        })
        .collect();
    let child = FieldDescriptor::new(
        format!("{key}:1"),
        format!("{label}{CASCADING_CHILD_LABEL_SUFFIX}"),
        FieldKind::SelectCascading,
        remote_type.as_str(),
    )
    .and_then(|child| child.with_parent_key(key.as_str()))
    .map_err(|error| AppError::Parse(format!("field '{key}': {error}")))?
    .required(raw.required)
    .displayed(raw.displayed)
    .with_description(description)
    .with_options(child_options);

    Ok(vec![parent.with_options(options), child])
}

fn parse_values(field_key: &str, values: Vec<RawFieldValue>) -> AppResult<Vec<FieldOption>> {
    values
        .into_iter()
        .map(|value| {
            let id = identity(value.value.as_ref()).ok_or_else(|| {
                AppError::Parse(format!("an option of field '{field_key}' is missing 'value'"))
            })?;
            let display_value = value.label.unwrap_or_else(|| id.clone());
            let children = parse_values(field_key, value.children)?;
            FieldOption::new(id, display_value)
                .map(|option| option.with_children(children))
                .map_err(|error| AppError::Parse(format!("field '{field_key}': {error}")))
        })
        .collect()
}

fn parse_proforma_fields(template: &RawProformaTemplate) -> AppResult<Vec<FieldDescriptor>> {
    let mut fields = Vec::with_capacity(template.design.questions.len());

    for (question_id, question) in &template.design.questions {
        let question: RawProformaQuestion =
            from_raw(question.clone(), &format!("proforma question '{question_id}'"))?;
        let label = question
            .label
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                AppError::Parse(format!("proforma question '{question_id}' is missing 'label'"))
            })?;
        let remote_type = question.question_type.ok_or_else(|| {
            AppError::Parse(format!("proforma question '{question_id}' is missing 'type'"))
        })?;
        let key = question
            .jira_field
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| question_id.clone());

        let options = match template.proforma_field_options.fields.get(key.as_str()) {
            Some(raw_options) => parse_proforma_options(&key, raw_options.clone())?,
            None => Vec::new(),
        };

        let field = FieldDescriptor::new(
            key.as_str(),
            label,
            FieldKind::ProformaCustom,
            remote_type,
        )
        .and_then(|field| field.with_proforma_question(question_id.as_str()))
        .map_err(|error| AppError::Parse(format!("proforma question '{question_id}': {error}")))?
        .required(question.validation.rq)
        .with_description(question.description.unwrap_or_default())
        .with_options(options);
        fields.push(field);
    }

    Ok(fields)
}

fn parse_proforma_options(field_key: &str, raw: Value) -> AppResult<Vec<FieldOption>> {
    let choices: Vec<RawProformaChoice> =
        from_raw(raw, &format!("proforma options of field '{field_key}'"))?;
    choices
        .into_iter()
        .map(|choice| {
            let id = identity(choice.id.as_ref()).ok_or_else(|| {
                AppError::Parse(format!(
                    "a proforma option of field '{field_key}' is missing 'id'"
                ))
            })?;
            let display_value = choice.label.unwrap_or_else(|| id.clone());
            FieldOption::new(id, display_value)
                .map_err(|error| AppError::Parse(format!("field '{field_key}': {error}")))
        })
        .collect()
}

fn from_raw<T: DeserializeOwned>(raw: Value, context: &str) -> AppResult<T> {
    serde_json::from_value(raw)
        .map_err(|error| AppError::Parse(format!("malformed {context}: {error}")))
}

/// Identifiers arrive as strings or numbers depending on the endpoint.
fn identity(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

fn default_displayed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCustomerModels {
    portal: Option<RawPortal>,
    req_create: Option<RawReqCreate>,
    xsrf_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPortal {
    id: Option<Value>,
    service_desk_id: Option<Value>,
    project_id: Option<Value>,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReqCreate {
    id: Option<Value>,
    form: Option<RawFormHeader>,
    #[serde(default)]
    fields: Vec<RawField>,
    proforma_template_form: Option<RawProformaTemplate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormHeader {
    name: Option<String>,
    description_html: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    field_id: Option<String>,
    label: Option<String>,
    field_type: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default = "default_displayed")]
    displayed: bool,
    description: Option<String>,
    #[serde(default)]
    values: Vec<RawFieldValue>,
    auto_complete_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFieldValue {
    value: Option<Value>,
    label: Option<String>,
    #[serde(default)]
    children: Vec<RawFieldValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProformaTemplate {
    updated: Option<String>,
    #[serde(default)]
    design: RawProformaDesign,
    #[serde(default)]
    proforma_field_options: RawProformaFieldOptions,
}

#[derive(Debug, Default, Deserialize)]
struct RawProformaDesign {
    #[serde(default)]
    settings: RawProformaSettings,
    #[serde(default)]
    questions: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProformaSettings {
    template_id: Option<Value>,
    template_form_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProformaFieldOptions {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProformaQuestion {
    #[serde(rename = "type")]
    question_type: Option<String>,
    label: Option<String>,
    jira_field: Option<String>,
    description: Option<String>,
    #[serde(default)]
    validation: RawProformaValidation,
}

#[derive(Debug, Default, Deserialize)]
struct RawProformaValidation {
    #[serde(default)]
    rq: bool,
}

#[derive(Debug, Deserialize)]
struct RawProformaChoice {
    id: Option<Value>,
    label: Option<String>,
}
