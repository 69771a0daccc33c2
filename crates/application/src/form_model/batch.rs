use super::*;

/// One resolved entry of a value batch.
struct PendingValue<'a> {
    field: &'a FieldDescriptor,
    raw: Value,
}

/// Coerces a batch against a copy of `current` and returns the new map.
///
/// Cascading parents are coerced before their children regardless of input
/// order, so a child may reference a parent set in the same batch.
pub(super) fn apply<I, K>(
    form: &ParsedForm,
    coercer: &ValueCoercer,
    current: &FieldValues,
    entries: I,
) -> AppResult<FieldValues>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut pending = resolve_entries(form, entries)?;
    pending.sort_by_key(|entry| entry.field.parent_key().is_some());

    let mut staged = current.clone();
    for entry in pending {
        let coerced = coercer.coerce(entry.field, &entry.raw, &staged)?;
        debug!(
            field_key = %entry.field.key(),
            field_kind = %entry.field.kind().as_str(),
            "field value coerced"
        );

        if staged.get(entry.field.key()) != Some(&coerced) {
            for child in form.registry().children_of(entry.field.key()) {
                staged.remove(child.key());
            }
        }

        staged.insert(entry.field.key().to_owned(), coerced);
    }

    Ok(staged)
}

fn resolve_entries<I, K>(form: &ParsedForm, entries: I) -> AppResult<Vec<PendingValue<'_>>>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let registry = form.registry();
    let mut pending = Vec::new();
    let mut seen_keys = BTreeSet::new();

    for (identifier, raw) in entries {
        let field = registry.resolve(identifier.as_ref())?;

        let expanded = match compound_cascading_value(field, raw) {
            Ok((parent_raw, child_raw)) => {
                let child = registry
                    .children_of(field.key())
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "field '{}' has no subfield to receive '{}'",
                            field.label(),
                            child_raw
                        ))
                    })?;
                vec![
                    PendingValue {
                        field,
                        raw: parent_raw,
                    },
                    PendingValue {
                        field: child,
                        raw: child_raw,
                    },
                ]
            }
            Err(raw) => vec![PendingValue { field, raw }],
        };

        for entry in expanded {
            if !seen_keys.insert(entry.field.key()) {
                return Err(AppError::Validation(format!(
                    "field '{}' is supplied more than once in the same batch",
                    entry.field.label()
                )));
            }
            pending.push(entry);
        }
    }

    Ok(pending)
}

/// Splits a `[parent, child]` array given for a top-level cascading select.
///
/// Hands the raw value back unchanged when it is not such a pair.
fn compound_cascading_value(field: &FieldDescriptor, raw: Value) -> Result<(Value, Value), Value> {
    if field.kind() != FieldKind::SelectCascading || field.parent_key().is_some() {
        return Err(raw);
    }

    match raw {
        Value::Array(mut items) if items.len() == 2 => {
            let child = items.pop().unwrap_or(Value::Null);
            let parent = items.pop().unwrap_or(Value::Null);
            Ok((parent, child))
        }
        other => Err(other),
    }
}
