//! Endpoints the extraction pipeline calls to report progress.

pub mod processing_started;
pub mod result_ready;
pub mod report_error;
