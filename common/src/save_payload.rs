//! Projects the reviewer's edits back onto the processed document.

use crate::edit_state::EditState;
use crate::field_classifier::EditKey;
use crate::processed_document::{Page, ProcessedDocument};

/// Builds the document to persist: a copy of `original` in which every data-page
/// field with an edit-state entry carries that value as `typist_content`.
///
/// Only `typist_content` changes, and only for entries the reviewer changed since
/// seeding. Pages, fields and their order are kept, and a field whose entry
/// equals its machine value keeps no correction.
pub fn build_payload(original: &ProcessedDocument, edits: &EditState) -> ProcessedDocument {
    let mut payload = original.clone();
    if let Some(page) = payload.data_page_mut() {
        apply_edits(page, edits);
    }
    payload
}

/// Returns how many fields received a new `typist_content`.
pub fn apply_edits(page: &mut Page, edits: &EditState) -> usize {
    let mut rewritten = 0;
    for field in page.fields.iter_mut() {
        let key = EditKey::for_field(field);
        // fields sharing a key seed one entry; untouched entries must not leak across them
        if !edits.is_key_dirty(key.as_str()) {
            continue;
        }
        let Some(value) = edits.get(key.as_str()) else {
            continue;
        };
        match &field.typist_content {
            Some(current) if current == value => continue,
            None if field.field_value_text() == value => continue,
            _ => {}
        }
        field.typist_content = Some(value.to_string());
        rewritten += 1;
    }
    rewritten
}
