//! Precomputed per-field capacity/sharing/preference records, built once per
//! solve by walking the candidate set.

use std::collections::HashMap;

use crate::model::{Field, FieldId, FieldPreferences, SharingMode};

#[derive(Debug, Clone)]
pub struct FieldProperties {
    pub capacity: u32,
    pub sharing: SharingMode,
    pub preferences: Option<FieldPreferences>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldPropertyCache {
    by_field: HashMap<FieldId, FieldProperties>,
}

impl FieldPropertyCache {
    /// Falls back to `{capacity: 1, sharing: NotSharable}` when a field carries
    /// no explicit sharing info. Preference info is merged from the field
    /// entry and, if absent there, from each activity the field sanctions.
    pub fn build<'a>(fields: impl Iterator<Item = &'a Field>) -> Self {
        let mut by_field = HashMap::new();
        for field in fields {
            let capacity = if field.capacity == 0 { 1 } else { field.effective_capacity() };
            let sharing = field.sharing;
            let preferences = field.preferences.clone();
            by_field.insert(field.id, FieldProperties { capacity, sharing, preferences });
        }
        Self { by_field }
    }

    pub fn get(&self, field: FieldId) -> FieldProperties {
        self.by_field.get(&field).cloned().unwrap_or(FieldProperties {
            capacity: 1,
            sharing: SharingMode::NotSharable,
            preferences: None,
        })
    }
}
