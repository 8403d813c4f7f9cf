//! Endpoint for listing uploaded documents.

use common::document_summary::DocumentListItem;
use sqlx::SqlitePool;

use crate::db_utils::document_records::fetch_all_documents;

pub async fn list_documents(pool: &SqlitePool) -> anyhow::Result<Vec<DocumentListItem>> {
    let records = fetch_all_documents(pool).await?;
    Ok(records.iter().map(|record| record.to_list_item()).collect())
}
