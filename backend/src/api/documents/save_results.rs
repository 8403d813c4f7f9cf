//! Endpoint for persisting a reviewed processed document.

use std::path::{Path, PathBuf};

use anyhow::Context;
use common::processed_document::ProcessedDocument;
use tracing::info;

use crate::api::documents::get_document::require_document;
use crate::app_state::AppState;
use crate::db_utils::document_records::set_result_json_path;
use crate::server_extra::api_error::ApiError;

/// Checks the payload is a processed document. The raw JSON is what gets
/// written, so attributes unknown to the models are kept.
pub fn validate_processed_document(payload: &serde_json::Value) -> anyhow::Result<()> {
    let Some(serde_json::Value::Array(_)) = payload.get("pages") else {
        return Err(ApiError::BadRequest("Document must be an object with a pages array".to_string()).into());
    };
    serde_json::from_value::<ProcessedDocument>(payload.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid processed document: {}", e)))?;
    Ok(())
}

pub async fn save_results(state: &AppState, doc_id: &str, payload: serde_json::Value) -> anyhow::Result<()> {
    let record = require_document(&state.pool, doc_id).await?;
    validate_processed_document(&payload)?;

    let path = match &record.result_json_path {
        Some(path) => PathBuf::from(path),
        None => state.storage.default_result_json(doc_id),
    };
    let body = serde_json::to_vec_pretty(&payload)?;
    write_replacing(&path, &body).await?;

    if record.result_json_path.is_none() {
        set_result_json_path(&state.pool, doc_id, &path.to_string_lossy()).await?;
    }
    info!("Saved reviewed results for {} to {}", doc_id, path.display());
    Ok(())
}

/// Writes next to the target and renames over it, so readers never see a partial file.
async fn write_replacing(path: &Path, body: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, body)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
