//! State shared by every request handler.

use sqlx::SqlitePool;

use crate::config::StorageLayout;
use crate::server_extra::event_broadcaster::EventBroadcaster;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub storage: StorageLayout,
    pub events: EventBroadcaster,
}

impl AppState {
    pub fn new(pool: SqlitePool, storage: StorageLayout, events: EventBroadcaster) -> Self {
        Self { pool, storage, events }
    }
}
