use std::collections::HashMap;

use deskform_core::{AppError, AppResult};

use crate::{FieldDescriptor, FieldKind};

/// Ordered field descriptors of one fetched form.
///
/// Lookup maps are built once in [`FieldRegistry::new`] and never change
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
    by_label: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Builds a registry, enforcing unique keys, unique labels and valid
    /// cascading parents.
    pub fn new(fields: Vec<FieldDescriptor>) -> AppResult<Self> {
        let mut by_label = HashMap::with_capacity(fields.len());
        let mut by_key = HashMap::with_capacity(fields.len());

        for (index, field) in fields.iter().enumerate() {
            if by_key.insert(field.key().to_owned(), index).is_some() {
                return Err(AppError::Parse(format!(
                    "duplicate field key '{}' in form",
                    field.key()
                )));
            }

            if by_label.insert(field.label().to_owned(), index).is_some() {
                return Err(AppError::Parse(format!(
                    "duplicate field label '{}' in form",
                    field.label()
                )));
            }
        }

        for field in &fields {
            let Some(parent_key) = field.parent_key() else {
                continue;
            };

            let Some(parent) = by_key.get(parent_key).map(|index| &fields[*index]) else {
                return Err(AppError::Parse(format!(
                    "field '{}' references unknown parent field '{}'",
                    field.key(),
                    parent_key
                )));
            };

            if parent.kind() != FieldKind::SelectCascading || parent.parent_key().is_some() {
                return Err(AppError::Parse(format!(
                    "field '{}' must cascade from a top-level cascading select, not '{}'",
                    field.key(),
                    parent_key
                )));
            }
        }

        let mut by_alias = HashMap::new();
        for parent in fields.iter().filter(|field| field.parent_key().is_none()) {
            let children = fields
                .iter()
                .enumerate()
                .filter(|(_, field)| field.parent_key() == Some(parent.key()));
            for (position, (index, _)) in children.enumerate() {
                by_alias.insert(format!("{}:{}", parent.label(), position + 1), index);
            }
        }

        Ok(Self {
            fields,
            by_label,
            by_key,
            by_alias,
        })
    }

    /// Resolves a field by exact label, then by key, then by the
    /// `<ParentLabel>:<n>` alias of a cascading child.
    pub fn resolve(&self, label_or_key: &str) -> AppResult<&FieldDescriptor> {
        self.by_label
            .get(label_or_key)
            .or_else(|| self.by_key.get(label_or_key))
            .or_else(|| self.by_alias.get(label_or_key))
            .map(|index| &self.fields[*index])
            .ok_or_else(|| AppError::UnknownField(label_or_key.to_owned()))
    }

    /// Returns the descriptor with the given key.
    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<&FieldDescriptor> {
        self.by_key.get(key).map(|index| &self.fields[*index])
    }

    /// Returns cascading children of a field in parse order.
    #[must_use]
    pub fn children_of(&self, key: &str) -> Vec<&FieldDescriptor> {
        self.fields
            .iter()
            .filter(|field| field.parent_key() == Some(key))
            .collect()
    }

    /// Returns every descriptor in parse order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
