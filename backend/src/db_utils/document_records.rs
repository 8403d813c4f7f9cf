//! Row-level access to the `documents` table.

use anyhow::Context;
use common::document_summary::{DocumentDetail, DocumentListItem, DocumentStatus};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub original_name: String,
    pub doc_type: Option<String>,
    pub status: DocumentStatus,
    pub upload_time: String,
    pub result_pdf_path: Option<String>,
    pub result_json_path: Option<String>,
}

impl DocumentRecord {
    fn from_row(row: &SqliteRow) -> anyhow::Result<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            original_name: row.try_get("original_name")?,
            doc_type: row.try_get("type")?,
            status: status.parse()?,
            upload_time: row.try_get("upload_time")?,
            result_pdf_path: row.try_get("result_pdf_path")?,
            result_json_path: row.try_get("result_json_path")?,
        })
    }

    pub fn to_list_item(&self) -> DocumentListItem {
        DocumentListItem {
            id: self.id.clone(),
            original_name: self.original_name.clone(),
            doc_type: self.doc_type.clone(),
            status: self.status,
            upload_time: self.upload_time.clone(),
            has_pdf: self.result_pdf_path.is_some(),
            has_json: self.result_json_path.is_some(),
        }
    }

    pub fn to_detail(&self) -> DocumentDetail {
        DocumentDetail {
            item: self.to_list_item(),
            result_pdf_url: self.result_pdf_path.as_ref().map(|_| format!("/api/results/pdf/{}", self.id)),
            result_json_url: self.result_json_path.as_ref().map(|_| format!("/api/results/json/{}", self.id)),
        }
    }
}

pub async fn insert_document(pool: &SqlitePool, record: &DocumentRecord) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO documents (id, original_name, type, status, upload_time, result_pdf_path, result_json_path)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.original_name)
    .bind(&record.doc_type)
    .bind(record.status.as_str())
    .bind(&record.upload_time)
    .bind(&record.result_pdf_path)
    .bind(&record.result_json_path)
    .execute(pool)
    .await
    .context("Failed to insert document")?;
    Ok(())
}

pub async fn fetch_document(pool: &SqlitePool, doc_id: &str) -> anyhow::Result<Option<DocumentRecord>> {
    let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
        .bind(doc_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(DocumentRecord::from_row).transpose()
}

pub async fn fetch_all_documents(pool: &SqlitePool) -> anyhow::Result<Vec<DocumentRecord>> {
    let rows = sqlx::query("SELECT * FROM documents ORDER BY upload_time DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(DocumentRecord::from_row).collect()
}

pub async fn update_status(pool: &SqlitePool, doc_id: &str, status: DocumentStatus) -> anyhow::Result<()> {
    sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(doc_id)
        .execute(pool)
        .await
        .context("Failed to update document status")?;
    Ok(())
}

pub async fn set_results(
    pool: &SqlitePool,
    doc_id: &str,
    status: DocumentStatus,
    pdf_path: Option<&str>,
    json_path: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE documents SET result_pdf_path = ?, result_json_path = ?, status = ? WHERE id = ?")
        .bind(pdf_path)
        .bind(json_path)
        .bind(status.as_str())
        .bind(doc_id)
        .execute(pool)
        .await
        .context("Failed to update document results")?;
    Ok(())
}

pub async fn set_result_json_path(pool: &SqlitePool, doc_id: &str, json_path: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE documents SET result_json_path = ? WHERE id = ?")
        .bind(json_path)
        .bind(doc_id)
        .execute(pool)
        .await
        .context("Failed to update result json path")?;
    Ok(())
}
