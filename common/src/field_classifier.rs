//! Splits a page's flat field list into header fields and table rows.
//!
//! The classification is a pure projection of the page: it never looks at the
//! reviewer's edits and can be recomputed whenever the document changes.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::processed_document::{ExtractedField, Page};

pub type RowIndex = i64;

/// Where a field lands in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPlacement {
    Header,
    TableRow(RowIndex),
}

impl FieldPlacement {
    /// `-1`, `0` and a missing index all mark a header field; a positive index
    /// is the table row. Other negative indexes are treated as header fields so
    /// that every field is placed somewhere.
    pub fn of(field: &ExtractedField) -> Self {
        match field.array_index {
            None | Some(-1) | Some(0) => Self::Header,
            Some(index) if index > 0 => Self::TableRow(index),
            Some(_) => Self::Header,
        }
    }
}

/// Stable identifier joining a view cell, its edit-state entry and its write-back target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditKey(String);

impl EditKey {
    pub const ROW_SEPARATOR: &'static str = "__";

    pub fn header(field_name: &str) -> Self {
        Self(field_name.to_string())
    }

    pub fn table(row: RowIndex, field_name: &str) -> Self {
        Self(format!("{row}{}{field_name}", Self::ROW_SEPARATOR))
    }

    pub fn for_field(field: &ExtractedField) -> Self {
        match FieldPlacement::of(field) {
            FieldPlacement::Header => Self::header(&field.field_name),
            FieldPlacement::TableRow(row) => Self::table(row, &field.field_name),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EditKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EditKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EditKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EditKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub index: RowIndex,
    /// `field_name → display value`. A column missing from the row has no entry.
    pub cells: BTreeMap<String, String>,
}

impl TableRow {
    pub fn cell(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

/// View model derived from one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifiedPage {
    pub header_fields: Vec<ExtractedField>,
    pub table_fields: Vec<ExtractedField>,
    pub columns: Vec<String>,
    pub column_labels: BTreeMap<String, String>,
    pub rows: Vec<TableRow>,
}

impl ClassifiedPage {
    pub fn column_label<'a>(&'a self, column: &'a str) -> &'a str {
        self.column_labels.get(column).map(String::as_str).unwrap_or(column)
    }

    pub fn row(&self, index: RowIndex) -> Option<&TableRow> {
        self.rows.iter().find(|row| row.index == index)
    }

    pub fn is_empty(&self) -> bool {
        self.header_fields.is_empty() && self.table_fields.is_empty()
    }
}

pub fn classify(page: &Page) -> ClassifiedPage {
    classify_fields(&page.fields)
}

pub fn classify_fields(fields: &[ExtractedField]) -> ClassifiedPage {
    let mut header_fields = Vec::new();
    let mut table_fields = Vec::new();
    for field in fields {
        match FieldPlacement::of(field) {
            FieldPlacement::Header => header_fields.push(field.clone()),
            FieldPlacement::TableRow(_) => table_fields.push(field.clone()),
        }
    }

    let (columns, column_labels) = derive_columns(&table_fields);
    let rows = group_rows(&table_fields);

    ClassifiedPage { header_fields, table_fields, columns, column_labels, rows }
}

/// One column per distinct `field_name`, represented by its lowest-ordered
/// instance. `sort_by_key` is stable, so equal orders keep encounter order.
fn derive_columns(table_fields: &[ExtractedField]) -> (Vec<String>, BTreeMap<String, String>) {
    let mut candidates = table_fields.iter().collect::<Vec<_>>();
    candidates.sort_by_key(|field| field.order_key());

    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    let mut column_labels = BTreeMap::new();
    for field in candidates {
        if seen.insert(field.field_name.as_str()) {
            columns.push(field.field_name.clone());
            column_labels.insert(field.field_name.clone(), field.label().to_string());
        }
    }
    (columns, column_labels)
}

fn group_rows(table_fields: &[ExtractedField]) -> Vec<TableRow> {
    let mut rows: BTreeMap<RowIndex, BTreeMap<String, String>> = BTreeMap::new();
    for field in table_fields {
        let FieldPlacement::TableRow(index) = FieldPlacement::of(field) else {
            continue;
        };
        rows.entry(index)
            .or_default()
            .insert(field.field_name.clone(), field.display_value());
    }
    rows.into_iter().map(|(index, cells)| TableRow { index, cells }).collect()
}
