//! Live-update notifications pushed over the event channels.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiveEventKind {
    #[serde(rename = "processing-started")]
    ProcessingStarted,
    #[serde(rename = "result-ready")]
    ResultReady,
    #[serde(rename = "error")]
    Error,
}

impl LiveEventKind {
    /// Name used as the SSE `event:` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessingStarted => "processing-started",
            Self::ResultReady => "result-ready",
            Self::Error => "error",
        }
    }
}

/// Event payload. The per-document channel scopes events by connection, so
/// `doc_id` is only required on the global channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub event: LiveEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

impl LiveEvent {
    pub fn processing_started(doc_id: impl Into<String>) -> Self {
        Self { event: LiveEventKind::ProcessingStarted, error_message: None, doc_id: Some(doc_id.into()) }
    }

    pub fn result_ready(doc_id: impl Into<String>) -> Self {
        Self { event: LiveEventKind::ResultReady, error_message: None, doc_id: Some(doc_id.into()) }
    }

    pub fn error(doc_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            event: LiveEventKind::Error,
            error_message: Some(error_message.into()),
            doc_id: Some(doc_id.into()),
        }
    }

    /// Parses one event data payload.
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn concerns(&self, doc_id: &str) -> bool {
        self.doc_id.as_deref() == Some(doc_id)
    }
}
