//! Processed document models produced by the extraction pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix the pipeline gives its own bookkeeping pages and fields, e.g. `_JobForm`.
pub const SYNTHETIC_PREFIX: char = '_';

/// Page-level attributes that carry a page's name.
const PAGE_NAME_KEYS: &[&str] = &["name", "page_name", "form_name"];

/// Attributes the review engine does not interpret. They are kept verbatim so a
/// saved document carries everything the pipeline produced.
pub type ExtraAttributes = BTreeMap<String, serde_json::Value>;

/// One OCR-extracted value.
///
/// `field_value` is kept as raw JSON because the pipeline is loosely typed and
/// the machine value must be written back exactly as it was read. A `null`
/// optional attribute reads as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractedField {
    #[serde(default)]
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typist_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl ExtractedField {
    pub fn new(field_name: impl Into<String>, field_value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            field_value: Some(serde_json::Value::String(field_value.into())),
            ..Default::default()
        }
    }

    pub fn with_array_index(mut self, array_index: i64) -> Self {
        self.array_index = Some(array_index);
        self
    }

    pub fn with_field_order(mut self, field_order: i64) -> Self {
        self.field_order = Some(field_order);
        self
    }

    pub fn with_typist_content(mut self, typist_content: impl Into<String>) -> Self {
        self.typist_content = Some(typist_content.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Machine value as text. Scalars are rendered, `null` and a missing value are empty.
    pub fn field_value_text(&self) -> String {
        match &self.field_value {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Value shown to the reviewer: the typist correction wins over the machine value.
    pub fn display_value(&self) -> String {
        match &self.typist_content {
            Some(content) => content.clone(),
            None => self.field_value_text(),
        }
    }

    pub fn label(&self) -> &str {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => description,
            _ => &self.field_name,
        }
    }

    pub fn order_key(&self) -> i64 {
        self.field_order.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Page {
    #[serde(default)]
    pub fields: Vec<ExtractedField>,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl Page {
    pub fn new(fields: Vec<ExtractedField>) -> Self {
        Self { fields, extra: ExtraAttributes::new() }
    }

    /// A job page the pipeline prepends: its name starts with `_`, or every
    /// field on it does.
    pub fn is_synthetic(&self) -> bool {
        let named = PAGE_NAME_KEYS
            .iter()
            .filter_map(|key| self.extra.get(*key).and_then(|value| value.as_str()))
            .any(|name| name.starts_with(SYNTHETIC_PREFIX));
        let internal_fields =
            !self.fields.is_empty() && self.fields.iter().all(|field| field.field_name.starts_with(SYNTHETIC_PREFIX));
        named || internal_fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProcessedDocument {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl ProcessedDocument {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages, extra: ExtraAttributes::new() }
    }

    /// Index of the reviewable page: the first one, skipping a leading
    /// synthetic page. `None` when no such page exists.
    pub fn data_page_index(&self) -> Option<usize> {
        let first = self.pages.first()?;
        let index = if first.is_synthetic() { 1 } else { 0 };
        (index < self.pages.len()).then_some(index)
    }

    pub fn data_page(&self) -> Option<&Page> {
        self.pages.get(self.data_page_index()?)
    }

    pub fn data_page_mut(&mut self) -> Option<&mut Page> {
        let index = self.data_page_index()?;
        self.pages.get_mut(index)
    }
}
