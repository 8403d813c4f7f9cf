//! Database helpers for document records.

pub mod sqlite_utils;
pub mod document_records;
