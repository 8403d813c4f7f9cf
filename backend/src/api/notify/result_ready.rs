use common::{
    document_summary::{DocumentStatus, NotifyResultReadyPayload},
    live_event::LiveEvent,
};
use tracing::info;

use crate::api::documents::get_document::require_document;
use crate::app_state::AppState;
use crate::db_utils::document_records::set_results;
use crate::server_extra::api_error::ApiError;

async fn ensure_exists(path: Option<&str>, field: &str) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(ApiError::BadRequest(format!("{} does not exist", field)).into());
    }
    Ok(())
}

pub async fn notify_result_ready(state: &AppState, payload: NotifyResultReadyPayload) -> anyhow::Result<()> {
    require_document(&state.pool, &payload.doc_id).await?;
    ensure_exists(payload.pdf_path.as_deref(), "pdf_path").await?;
    ensure_exists(payload.json_path.as_deref(), "json_path").await?;

    set_results(
        &state.pool,
        &payload.doc_id,
        DocumentStatus::Ready,
        payload.pdf_path.as_deref(),
        payload.json_path.as_deref(),
    )
    .await?;
    info!("Result ready: {} (pdf: {:?}, json: {:?})", payload.doc_id, payload.pdf_path, payload.json_path);
    state.events.broadcast_lossy(LiveEvent::result_ready(payload.doc_id));
    Ok(())
}
