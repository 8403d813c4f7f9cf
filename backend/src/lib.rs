//! Backend for the document review portal: document records, result files,
//! pipeline notifications and live updates.

pub mod api;
pub mod app_state;
pub mod config;
pub mod db_utils;
pub mod server_extra;

pub use app_state::AppState;
pub use server_extra::routes::build_router;
