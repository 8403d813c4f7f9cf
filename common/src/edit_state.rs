//! Reviewer's working copy of every editable field.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::field_classifier::{ClassifiedPage, EditKey};
use crate::processed_document::ExtractedField;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditStateError {
    #[error("no editable field with key `{0}`")]
    UnknownKey(String),
}

/// Edit key → current value, plus the values it was seeded with.
///
/// The store is only ever rebuilt through [`EditState::seed`]; deriving a new
/// view model from the document does not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditState {
    values: BTreeMap<EditKey, String>,
    baseline: BTreeMap<EditKey, String>,
}

impl EditState {
    /// A header field literally named like a cell key (`2__amount`) shares
    /// that cell's entry; the collision is logged.
    pub fn seed(header_fields: &[ExtractedField], table_fields: &[ExtractedField]) -> Self {
        let mut values = header_fields
            .iter()
            .map(|field| (EditKey::for_field(field), field.display_value()))
            .collect::<BTreeMap<_, _>>();
        let header_keys = values.keys().cloned().collect::<BTreeSet<_>>();
        for field in table_fields {
            let key = EditKey::for_field(field);
            if header_keys.contains(&key) {
                warn!(key = %key, "table cell shares its edit key with a header field");
            }
            values.insert(key, field.display_value());
        }
        Self { baseline: values.clone(), values }
    }

    pub fn reset(header_fields: &[ExtractedField], table_fields: &[ExtractedField]) -> Self {
        Self::seed(header_fields, table_fields)
    }

    pub fn from_classified(page: &ClassifiedPage) -> Self {
        Self::seed(&page.header_fields, &page.table_fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Replaces the value of one seeded key. Every other entry is left as is.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), EditStateError> {
        let slot = self
            .values
            .get_mut(key)
            .ok_or_else(|| EditStateError::UnknownKey(key.to_string()))?;
        *slot = value.into();
        Ok(())
    }

    pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Result<Self, EditStateError> {
        self.set(key, value)?;
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EditKey, &str)> {
        self.values.iter().map(|(key, value)| (key, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys whose value differs from what was seeded.
    pub fn dirty_keys(&self) -> Vec<&EditKey> {
        self.values
            .iter()
            .filter(|(key, value)| self.baseline.get(*key) != Some(*value))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn is_key_dirty(&self, key: &str) -> bool {
        self.values.get(key) != self.baseline.get(key)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_keys().is_empty()
    }
}
