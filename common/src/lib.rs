//! Common library exports shared between client and backend.

extern crate serde;


pub mod processed_document;
pub mod document_summary;
pub mod live_event;
pub mod field_classifier;
pub mod edit_state;
pub mod save_payload;
pub mod review_session;
