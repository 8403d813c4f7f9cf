//! Client configuration and endpoint paths.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8808";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Wait before re-opening a dropped live-update stream, unless the server
    /// sends its own `retry:` hint.
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from `PORTAL_*` variables; missing or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let request_timeout = lookup("PORTAL_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let reconnect_delay = lookup("PORTAL_RECONNECT_DELAY_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RECONNECT_DELAY_MS);
        Self {
            base_url: lookup("PORTAL_API_BASE_URL").unwrap_or(DEFAULT_API_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(request_timeout),
            reconnect_delay: Duration::from_millis(reconnect_delay),
        }
    }

    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(&self.base_url)
    }
}

/// Absolute URLs of the portal API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: String,
}

impl ApiEndpoints {
    pub fn new(base_url: &str) -> Self {
        Self { base: base_url.trim_end_matches('/').to_string() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn health(&self) -> String {
        format!("{}/health", self.base)
    }

    pub fn upload(&self) -> String {
        format!("{}/api/upload", self.base)
    }

    pub fn documents(&self) -> String {
        format!("{}/api/documents", self.base)
    }

    pub fn document(&self, doc_id: &str) -> String {
        format!("{}/api/documents/{}", self.base, doc_id)
    }

    pub fn approve(&self, doc_id: &str) -> String {
        format!("{}/api/documents/{}/approve", self.base, doc_id)
    }

    pub fn save_results(&self, doc_id: &str) -> String {
        format!("{}/api/documents/{}/results", self.base, doc_id)
    }

    pub fn result_json(&self, doc_id: &str) -> String {
        format!("{}/api/results/json/{}", self.base, doc_id)
    }

    pub fn events(&self) -> String {
        format!("{}/api/events", self.base)
    }

    pub fn document_events(&self, doc_id: &str) -> String {
        format!("{}/api/events/{}", self.base, doc_id)
    }
}
