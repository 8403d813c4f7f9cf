//! Portal server entry point.

use anyhow::Context;
use backend::{
    AppState, build_router,
    config::{BackendConfig, StorageLayout},
    db_utils::sqlite_utils::get_sqlite_pool,
    server_extra::event_broadcaster::EventBroadcaster,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BackendConfig::from_env();
    let storage = StorageLayout::new(&config.storage_dir);
    storage.ensure_dirs().await?;
    let pool = get_sqlite_pool(&config.database_url).await?;
    let state = AppState::new(pool, storage, EventBroadcaster::new(config.event_capacity));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("portal backend listening on {}", config.bind_addr);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
