//! Document records returned by the list and detail endpoints.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Queued,
    Processing,
    Ready,
    Error,
    Approved,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 5] = [
        DocumentStatus::Queued,
        DocumentStatus::Processing,
        DocumentStatus::Ready,
        DocumentStatus::Error,
        DocumentStatus::Approved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Approved => "approved",
        }
    }
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown document status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for DocumentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentListItem {
    pub id: String,
    pub original_name: String,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    pub status: DocumentStatus,
    pub upload_time: String,
    pub has_pdf: bool,
    pub has_json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub item: DocumentListItem,
    #[serde(default)]
    pub result_pdf_url: Option<String>,
    #[serde(default)]
    pub result_json_url: Option<String>,
}

/// Per-status totals shown above the document list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub queued: usize,
    pub processing: usize,
    pub ready: usize,
    pub error: usize,
    pub approved: usize,
}

impl StatusCounts {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a DocumentListItem>) -> Self {
        let mut counts = Self::default();
        for item in items {
            match item.status {
                DocumentStatus::Queued => counts.queued += 1,
                DocumentStatus::Processing => counts.processing += 1,
                DocumentStatus::Ready => counts.ready += 1,
                DocumentStatus::Error => counts.error += 1,
                DocumentStatus::Approved => counts.approved += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyResultReadyPayload {
    pub doc_id: String,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub json_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyProcessingStartedPayload {
    #[serde(default)]
    pub doc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyErrorPayload {
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}
