//! Endpoint for a single document record.

use common::document_summary::DocumentDetail;
use sqlx::SqlitePool;

use crate::db_utils::document_records::{DocumentRecord, fetch_document};
use crate::server_extra::api_error::ApiError;

pub async fn require_document(pool: &SqlitePool, doc_id: &str) -> anyhow::Result<DocumentRecord> {
    match fetch_document(pool, doc_id).await? {
        Some(record) => Ok(record),
        None => Err(ApiError::NotFound("Document not found".to_string()).into()),
    }
}

pub async fn get_document(pool: &SqlitePool, doc_id: &str) -> anyhow::Result<DocumentDetail> {
    let record = require_document(pool, doc_id).await?;
    Ok(record.to_detail())
}
