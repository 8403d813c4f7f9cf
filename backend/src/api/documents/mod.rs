//! Document API routes and module exports.

pub mod list_documents;
pub mod get_document;
pub mod upload_document;
pub mod approve_document;
pub mod save_results;
pub mod get_results;
