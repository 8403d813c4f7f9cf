//! Server configuration read from the environment.

use std::path::{Path, PathBuf};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub bind_addr: String,
    pub storage_dir: PathBuf,
    pub database_url: String,
    pub event_capacity: usize,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let storage_dir = PathBuf::from(std::env::var("PORTAL_STORAGE_DIR").unwrap_or("storage".to_string()));
        let database_url = std::env::var("PORTAL_DATABASE_URL")
            .unwrap_or(format!("sqlite://{}?mode=rwc", storage_dir.join("documents.db").display()));
        let event_capacity = std::env::var("PORTAL_EVENT_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        Self {
            bind_addr: std::env::var("PORTAL_BIND_ADDR").unwrap_or("0.0.0.0:8808".to_string()),
            storage_dir,
            database_url,
            event_capacity,
        }
    }
}

/// Where uploads and pipeline results live on disk.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub root: PathBuf,
    pub incoming: PathBuf,
    pub results: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self { incoming: root.join("incoming"), results: root.join("results"), root }
    }

    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        for dir in [&self.root, &self.incoming, &self.results] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create storage dir {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn incoming_dir(&self, doc_id: &str) -> PathBuf {
        self.incoming.join(doc_id)
    }

    pub fn default_result_json(&self, doc_id: &str) -> PathBuf {
        self.results.join(doc_id).join("result.json")
    }
}
