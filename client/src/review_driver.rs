//! Runs a [`ReviewSession`] against the portal API.
//!
//! The driver is the session's only owner. Fetches, events and saves are
//! processed one at a time through `&mut self`, so events are applied in the
//! order they arrive and a reload finishes before the next event is looked at.

use common::{
    edit_state::EditStateError,
    field_classifier::EditKey,
    live_event::LiveEvent,
    processed_document::ProcessedDocument,
    review_session::{MergeAction, ReviewError, ReviewSession, SessionState},
};
use tracing::{info, warn};

use crate::api_client::PortalApiClient;
use crate::live_updates::LiveUpdateSubscription;

/// A save awaiting the reviewer's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub doc_id: String,
    pub payload: ProcessedDocument,
    /// Edited keys with their new values.
    pub changes: Vec<(EditKey, String)>,
    pub approve: bool,
    document_version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    SavedAndApproved,
}

pub struct ReviewDriver {
    api: PortalApiClient,
    session: ReviewSession,
}

impl ReviewDriver {
    pub fn new(api: PortalApiClient, doc_id: impl Into<String>) -> Self {
        Self { api, session: ReviewSession::new(doc_id) }
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    /// Initial load, or a retry after an error.
    pub async fn load(&mut self) -> &SessionState {
        let ticket = self.session.begin_load();
        let outcome = self.api.fetch_outcome(self.session.doc_id()).await;
        self.session.complete_load(ticket, outcome);
        self.session.state()
    }

    pub async fn handle_event(&mut self, event: &LiveEvent) -> &SessionState {
        if let MergeAction::Reload(ticket) = self.session.handle_event(event) {
            let outcome = self.api.fetch_outcome(self.session.doc_id()).await;
            self.session.complete_load(ticket, outcome);
        }
        self.session.state()
    }

    /// Waits for the next event and applies it. `None` when the subscription
    /// has shut down.
    pub async fn next_event(&mut self, subscription: &mut LiveUpdateSubscription) -> Option<&SessionState> {
        let event = subscription.next().await?;
        Some(self.handle_event(&event).await)
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> Result<(), EditStateError> {
        self.session.set_field(key, value)
    }

    pub fn reset_edits(&mut self) {
        self.session.reset_edits();
    }

    /// Builds the save for the current edits. Nothing is sent until
    /// [`ReviewDriver::commit_save`] is called with the result.
    pub fn prepare_save(&self, approve: bool) -> Option<PendingSave> {
        let payload = self.session.build_save_payload()?;
        let edits = self.session.edits();
        let changes = edits
            .dirty_keys()
            .into_iter()
            .map(|key| (key.clone(), edits.get(key.as_str()).unwrap_or_default().to_string()))
            .collect();
        Some(PendingSave {
            doc_id: self.session.doc_id().to_string(),
            payload,
            changes,
            approve,
            document_version: self.session.document_version(),
        })
    }

    /// Persists a confirmed save, then approves when requested. An approve
    /// failure is reported separately since the save already went through.
    pub async fn commit_save(&mut self, pending: PendingSave) -> Result<SaveOutcome, ReviewError> {
        if pending.document_version != self.session.document_version() {
            return Err(ReviewError::SaveFailed("document was reloaded after the save was prepared".to_string()));
        }
        self.api
            .save_processed_document(&pending.doc_id, &pending.payload)
            .await
            .map_err(|e| ReviewError::SaveFailed(e.to_string()))?;
        self.session.complete_save(pending.payload);
        info!("saved {} ({} changed fields)", pending.doc_id, pending.changes.len());

        if !pending.approve {
            return Ok(SaveOutcome::Saved);
        }
        match self.api.approve_document(&pending.doc_id).await {
            Ok(_) => Ok(SaveOutcome::SavedAndApproved),
            Err(e) => {
                warn!("saved {} but approve failed: {}", pending.doc_id, e);
                Err(ReviewError::ApproveFailed(e.to_string()))
            }
        }
    }
}
