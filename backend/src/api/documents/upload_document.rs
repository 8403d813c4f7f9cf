//! Endpoint for uploading a document into the processing queue.

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use common::document_summary::{DocumentDetail, DocumentStatus};
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::db_utils::document_records::{DocumentRecord, insert_document};
use crate::server_extra::api_error::ApiError;

pub const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png", ".tif", ".tiff"];

pub fn validate_extension(filename: &str) -> anyhow::Result<()> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::BadRequest(format!("Unsupported file type: {}", ext)).into());
    }
    Ok(())
}

pub async fn upload_document(
    state: &AppState,
    filename: &str,
    doc_type: Option<String>,
    content: Bytes,
) -> anyhow::Result<DocumentDetail> {
    // only the final path component is kept
    let original_name = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing file name".to_string()))?
        .to_string();
    validate_extension(&original_name)?;

    let doc_id = uuid::Uuid::new_v4().to_string();
    let upload_time = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    let doc_folder = state.storage.incoming_dir(&doc_id);
    tokio::fs::create_dir_all(&doc_folder)
        .await
        .with_context(|| format!("Failed to create {}", doc_folder.display()))?;
    tokio::fs::write(doc_folder.join(&original_name), &content)
        .await
        .context("Failed to store uploaded file")?;

    let meta = json!({
        "doc_id": doc_id,
        "type": doc_type.clone().unwrap_or("document".to_string()),
    });
    tokio::fs::write(doc_folder.join("meta.json"), serde_json::to_vec_pretty(&meta)?)
        .await
        .context("Failed to write meta.json")?;

    let record = DocumentRecord {
        id: doc_id,
        original_name,
        doc_type,
        status: DocumentStatus::Queued,
        upload_time,
        result_pdf_path: None,
        result_json_path: None,
    };
    insert_document(&state.pool, &record).await?;
    info!("Document uploaded: {} ({}, {} bytes)", record.id, record.original_name, content.len());
    Ok(record.to_detail())
}
