//! Endpoints serving the pipeline's result files.

use std::path::Path;

use anyhow::Context;
use sqlx::SqlitePool;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::db_utils::document_records::fetch_document;
use crate::server_extra::api_error::ApiError;

pub async fn get_result_json(pool: &SqlitePool, doc_id: &str) -> anyhow::Result<Vec<u8>> {
    let path = fetch_document(pool, doc_id)
        .await?
        .and_then(|record| record.result_json_path)
        .ok_or_else(|| ApiError::NotFound("JSON not found".to_string()))?;
    match tokio::fs::read(&path).await {
        Ok(body) => Ok(body),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("JSON not found".to_string()).into())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path)),
    }
}

pub async fn open_result_pdf(pool: &SqlitePool, doc_id: &str) -> anyhow::Result<(u64, ReaderStream<File>)> {
    let path = fetch_document(pool, doc_id)
        .await?
        .and_then(|record| record.result_pdf_path)
        .ok_or_else(|| ApiError::NotFound("PDF not found".to_string()))?;
    let file = match File::open(Path::new(&path)).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("PDF not found".to_string()).into());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to open {}", path)),
    };
    let size = file.metadata().await?.len();
    tracing::info!("Streaming result pdf for {} ({} bytes)", doc_id, size);
    Ok((size, ReaderStream::new(file)))
}
