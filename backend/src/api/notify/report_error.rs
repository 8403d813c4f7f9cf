use common::{
    document_summary::{DocumentStatus, NotifyErrorPayload},
    live_event::LiveEvent,
};
use tracing::warn;

use crate::api::documents::get_document::require_document;
use crate::app_state::AppState;
use crate::db_utils::document_records::set_results;
use crate::server_extra::api_error::ApiError;

pub async fn notify_error(state: &AppState, payload: NotifyErrorPayload) -> anyhow::Result<()> {
    let doc_id = payload
        .doc_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("doc_id is required".to_string()))?;
    let error_message = payload
        .error_message
        .filter(|message| !message.is_empty())
        .ok_or_else(|| ApiError::BadRequest("error_message is required".to_string()))?;

    require_document(&state.pool, &doc_id).await?;
    set_results(&state.pool, &doc_id, DocumentStatus::Error, None, None).await?;
    warn!("Processing failed for {}: {}", doc_id, error_message);
    state.events.broadcast_lossy(LiveEvent::error(doc_id, error_message));
    Ok(())
}
