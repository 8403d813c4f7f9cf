use common::{
    document_summary::{DocumentStatus, NotifyProcessingStartedPayload},
    live_event::LiveEvent,
};
use tracing::info;

use crate::api::documents::get_document::require_document;
use crate::app_state::AppState;
use crate::db_utils::document_records::update_status;
use crate::server_extra::api_error::ApiError;

pub async fn notify_processing_started(state: &AppState, payload: NotifyProcessingStartedPayload) -> anyhow::Result<()> {
    let doc_id = payload
        .doc_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("doc_id missing".to_string()))?;
    require_document(&state.pool, &doc_id).await?;
    update_status(&state.pool, &doc_id, DocumentStatus::Processing).await?;
    info!("Processing started: {}", doc_id);
    state.events.broadcast_lossy(LiveEvent::processing_started(doc_id));
    Ok(())
}
