//! Client for the document review portal: HTTP API access, the live-update
//! channel and the driver that runs a review session against them.

pub mod api_client;
pub mod config;
pub mod error;
pub mod live_updates;
pub mod review_driver;
