use deskform_core::{AppError, AppResult};
use deskform_domain::{PayloadValue, SubmissionPayload};
use url::form_urlencoded;

/// Flattens a submission into ordered `name=value` pairs.
///
/// Cascading pairs become `key` and `key:1`, multi-select ids repeat the
/// key, and proforma answers travel as one JSON string.
pub(super) fn form_pairs(payload: &SubmissionPayload) -> AppResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();

    for (key, value) in payload.fields() {
        match value {
            PayloadValue::Single(value) => pairs.push((key.clone(), value.clone())),
            PayloadValue::Multiple(ids) => {
                pairs.extend(ids.iter().map(|id| (key.clone(), id.clone())));
            }
            PayloadValue::Cascading(pair) => {
                pairs.push((key.clone(), pair.parent_value.clone()));
                if let Some(child_value) = &pair.child_value {
                    pairs.push((format!("{key}:1"), child_value.clone()));
                }
            }
        }
    }

    if let Some(proforma) = payload.proforma() {
        let encoded = serde_json::to_string(proforma).map_err(|error| {
            AppError::Internal(format!("failed to encode proforma form data: {error}"))
        })?;
        pairs.push(("proformaFormData".to_owned(), encoded));
    }
    if let Some(project_id) = payload.project_id() {
        pairs.push(("projectId".to_owned(), project_id.to_owned()));
    }
    if let Some(atl_token) = payload.atl_token() {
        pairs.push(("atl_token".to_owned(), atl_token.to_owned()));
    }

    Ok(pairs)
}

/// Encodes a submission as an `application/x-www-form-urlencoded` body.
pub(super) fn encode_submission(payload: &SubmissionPayload) -> AppResult<String> {
    let pairs = form_pairs(payload)?;
    Ok(form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish())
}
