//! Portal API endpoint functions. Each returns `anyhow::Result`; the HTTP
//! handlers in `server_extra::routes` turn failures into status codes.

pub mod documents;
pub mod notify;
