//! Endpoint for approving a reviewed document.

use common::document_summary::{DocumentDetail, DocumentStatus};
use sqlx::SqlitePool;
use tracing::info;

use crate::api::documents::get_document::require_document;
use crate::db_utils::document_records::{DocumentRecord, update_status};
use crate::server_extra::api_error::ApiError;

pub async fn approve_document(pool: &SqlitePool, doc_id: &str) -> anyhow::Result<DocumentDetail> {
    let record = require_document(pool, doc_id).await?;
    if record.result_json_path.is_none() {
        return Err(ApiError::Conflict("Document has no result to approve".to_string()).into());
    }
    update_status(pool, doc_id, DocumentStatus::Approved).await?;
    info!("Document approved: {}", doc_id);
    let record = DocumentRecord { status: DocumentStatus::Approved, ..record };
    Ok(record.to_detail())
}
