use super::*;

impl FormModel {
    /// Returns every field in registry order.
    pub fn list_fields(&self) -> AppResult<Vec<FieldSummary>> {
        Ok(self
            .form()?
            .registry()
            .fields()
            .iter()
            .map(FieldSummary::from)
            .collect())
    }

    /// Returns the candidate values of one field.
    ///
    /// Object pickers are looked up remotely with `query` as the filter.
    /// Cascading fields narrow their candidates by `parent_value`, falling
    /// back to the parent option already set on the model.
    pub async fn list_field_values(
        &self,
        field: &str,
        parent_value: Option<&str>,
        query: Option<&str>,
    ) -> AppResult<Vec<OptionSummary>> {
        let form = self.form()?;
        let descriptor = form.registry().resolve(field)?;

        match descriptor.kind() {
            FieldKind::ObjectPicker => {
                let metadata = form.metadata();
                let candidates = self
                    .autocomplete
                    .lookup(AutocompleteQuery {
                        portal_id: metadata.portal_id().to_owned(),
                        request_type_id: metadata.request_type_id().to_owned(),
                        field_key: descriptor.key().to_owned(),
                        query: query.unwrap_or_default().to_owned(),
                        form_field_keys: standard_field_keys(form),
                    })
                    .await?;
                debug!(
                    field_key = %descriptor.key(),
                    candidate_count = candidates.len(),
                    "object picker candidates fetched"
                );
                Ok(candidates)
            }
            FieldKind::SelectCascading => self.cascading_candidates(descriptor, parent_value),
            _ => Ok(summaries(descriptor.options().iter())),
        }
    }

    fn cascading_candidates(
        &self,
        descriptor: &FieldDescriptor,
        parent_value: Option<&str>,
    ) -> AppResult<Vec<OptionSummary>> {
        let Some(parent_key) = descriptor.parent_key() else {
            let Some(parent_value) = parent_value else {
                return Ok(summaries(descriptor.options().iter()));
            };
            let chosen = self.match_parent_option(descriptor, parent_value)?;
            return Ok(summaries(chosen.children().iter()));
        };

        let parent_option_id = match parent_value {
            Some(parent_value) => {
                let parent = self.form()?.registry().by_key(parent_key).ok_or_else(|| {
                    AppError::Internal(format!(
                        "parent field '{}' of '{}' is not registered",
                        parent_key,
                        descriptor.label()
                    ))
                })?;
                Some(self.match_parent_option(parent, parent_value)?.id().to_owned())
            }
            None => self
                .values
                .get(parent_key)
                .and_then(CoercedValue::as_option_id)
                .map(str::to_owned),
        };

        Ok(match parent_option_id {
            Some(parent_option_id) => summaries(descriptor.options_under(&parent_option_id)),
            None => summaries(descriptor.options().iter()),
        })
    }

    fn match_parent_option<'a>(
        &self,
        parent: &'a FieldDescriptor,
        parent_value: &str,
    ) -> AppResult<&'a FieldOption> {
        let policy = self.coercer.policy();
        parent
            .options()
            .iter()
            .find(|option| policy.matches(option.display_value(), parent_value))
            .or_else(|| parent.option_by_id(policy.normalize_id(parent_value)))
            .ok_or_else(|| AppError::InvalidOption {
                field: parent.label().to_owned(),
                value: parent_value.to_owned(),
            })
    }
}

fn standard_field_keys(form: &ParsedForm) -> Vec<String> {
    form.registry()
        .fields()
        .iter()
        .filter(|field| field.kind() != FieldKind::ProformaCustom && field.parent_key().is_none())
        .map(|field| field.key().to_owned())
        .collect()
}

fn summaries<'a>(options: impl Iterator<Item = &'a FieldOption>) -> Vec<OptionSummary> {
    options.map(OptionSummary::from).collect()
}
