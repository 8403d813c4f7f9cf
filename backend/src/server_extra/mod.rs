//! HTTP surface: router, error mapping and the live-update broadcaster.

pub mod api_error;
pub mod event_broadcaster;
pub mod routes;
