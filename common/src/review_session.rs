//! State machine for one document review session.
//!
//! The session owns the working copy of a document: the last loaded
//! [`ProcessedDocument`], the view model classified from it, and the
//! reviewer's [`EditState`]. It does no I/O. Callers ask it for a
//! [`LoadTicket`], perform the fetch, and hand the outcome back; live-update
//! events are fed in arrival order and answered with the action to take.
//!
//! ```text
//! Idle -> Loading -> Ready | Awaiting | Error
//! Awaiting -> Ready        (later fetch or result-ready)
//! Ready -> Ready           (result-ready, fresh data)
//! any -> Loading           (explicit retry)
//! ```

use tracing::{debug, info, warn};

use crate::edit_state::{EditState, EditStateError};
use crate::field_classifier::{ClassifiedPage, classify};
use crate::live_event::{LiveEvent, LiveEventKind};
use crate::processed_document::ProcessedDocument;
use crate::save_payload::build_payload;

/// Failures the reviewer sees. Each I/O failure maps to exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("failed to load document: {0}")]
    Fetch(String),
    #[error("processing failed: {0}")]
    Pipeline(String),
    #[error("failed to save document: {0}")]
    SaveFailed(String),
    #[error("document saved but not approved: {0}")]
    ApproveFailed(String),
}

impl ReviewError {
    /// Whether the reviewer's edits reached the server.
    pub fn edits_persisted(&self) -> bool {
        matches!(self, Self::ApproveFailed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    /// The document exists but has produced no result yet.
    Awaiting,
    Error(ReviewError),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// What a document fetch returned, already mapped out of the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Loaded(ProcessedDocument),
    NotFound,
    Failed(String),
}

/// Stamp for one fetch. Only the most recently issued ticket is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// Fetch the document again and complete the ticket with the outcome.
    Reload(LoadTicket),
    Nothing,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    doc_id: String,
    state: SessionState,
    document: Option<ProcessedDocument>,
    view: ClassifiedPage,
    edits: EditState,
    generation: u64,
    document_version: u64,
}

impl ReviewSession {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            state: SessionState::Idle,
            document: None,
            view: ClassifiedPage::default(),
            edits: EditState::default(),
            generation: 0,
            document_version: 0,
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn document(&self) -> Option<&ProcessedDocument> {
        self.document.as_ref()
    }

    pub fn view(&self) -> &ClassifiedPage {
        &self.view
    }

    pub fn edits(&self) -> &EditState {
        &self.edits
    }

    /// Bumped every time a new document replaces the working copy.
    pub fn document_version(&self) -> u64 {
        self.document_version
    }

    /// Initial load or explicit retry. Leaves any terminal state.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.state = SessionState::Loading;
        self.next_ticket()
    }

    /// Background reload; the visible state stays the last known good one.
    pub fn begin_reload(&mut self) -> LoadTicket {
        self.next_ticket()
    }

    fn next_ticket(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket { generation: self.generation }
    }

    /// Applies a fetch result. Returns `false` when the ticket was superseded
    /// and the outcome was ignored.
    pub fn complete_load(&mut self, ticket: LoadTicket, outcome: FetchOutcome) -> bool {
        if ticket.generation != self.generation {
            debug!(doc_id = %self.doc_id, ticket = ticket.generation, current = self.generation, "ignoring stale fetch");
            return false;
        }
        match outcome {
            FetchOutcome::Loaded(document) => {
                self.install_document(document, true);
                self.state = SessionState::Ready;
            }
            FetchOutcome::NotFound if self.document.is_some() => {
                warn!(doc_id = %self.doc_id, "document vanished on reload, keeping loaded data");
                self.state = SessionState::Ready;
            }
            FetchOutcome::NotFound => {
                debug!(doc_id = %self.doc_id, "no result yet, waiting");
                self.state = SessionState::Awaiting;
            }
            FetchOutcome::Failed(message) => {
                self.fail(ReviewError::Fetch(message));
            }
        }
        true
    }

    /// Decides what a live-update event means for this session.
    pub fn handle_event(&mut self, event: &LiveEvent) -> MergeAction {
        if let Some(doc_id) = &event.doc_id {
            if doc_id != &self.doc_id {
                debug!(doc_id = %self.doc_id, event_doc_id = %doc_id, "event for another document");
                return MergeAction::Nothing;
            }
        }
        if self.state.is_terminal() {
            debug!(doc_id = %self.doc_id, event = event.event.as_str(), "session failed, ignoring event");
            return MergeAction::Nothing;
        }
        match event.event {
            LiveEventKind::ProcessingStarted => {
                info!(doc_id = %self.doc_id, "processing started");
                MergeAction::Nothing
            }
            LiveEventKind::ResultReady => {
                info!(doc_id = %self.doc_id, "result ready, reloading");
                MergeAction::Reload(self.begin_reload())
            }
            LiveEventKind::Error => {
                let message = event
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown processing error".to_string());
                self.fail(ReviewError::Pipeline(message));
                MergeAction::Nothing
            }
        }
    }

    /// Enters the terminal error state. Loaded data stays available and any
    /// fetch still in flight is invalidated.
    fn fail(&mut self, error: ReviewError) {
        warn!(doc_id = %self.doc_id, error = %error, "review session failed");
        self.generation += 1;
        self.state = SessionState::Error(error);
    }

    fn install_document(&mut self, document: ProcessedDocument, warn_on_discard: bool) {
        let discarded = self.edits.dirty_keys().len();
        if warn_on_discard && discarded > 0 {
            warn!(doc_id = %self.doc_id, discarded, "reload replaced unsaved edits");
        }
        self.view = document.data_page().map(classify).unwrap_or_default();
        self.edits = EditState::from_classified(&self.view);
        self.document = Some(document);
        self.document_version += 1;
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> Result<(), EditStateError> {
        self.edits.set(key, value)
    }

    /// Discards every edit since the last seeding.
    pub fn reset_edits(&mut self) {
        self.edits = EditState::from_classified(&self.view);
    }

    pub fn build_save_payload(&self) -> Option<ProcessedDocument> {
        self.document.as_ref().map(|document| build_payload(document, &self.edits))
    }

    /// Replaces the working copy with the version the server accepted. Edits
    /// made after the payload was built stay pending on top of it.
    pub fn complete_save(&mut self, saved: ProcessedDocument) {
        let persisted = saved
            .data_page()
            .map(|page| EditState::from_classified(&classify(page)))
            .unwrap_or_default();
        let pending = self
            .edits
            .iter()
            .filter(|(key, value)| persisted.get(key.as_str()) != Some(*value))
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect::<Vec<_>>();

        self.install_document(saved, false);
        for (key, value) in pending {
            if self.edits.set(key.as_str(), value).is_err() {
                warn!(doc_id = %self.doc_id, key = %key, "saved document dropped an edited field");
            }
        }
        if self.edits.is_dirty() {
            info!(doc_id = %self.doc_id, pending = self.edits.dirty_keys().len(), "edits made during save kept");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::processed_document::{ExtractedField, Page};

    fn document(amount: &str) -> ProcessedDocument {
        ProcessedDocument::new(vec![Page::new(vec![
            ExtractedField::new("invoice_no", "INV-1").with_array_index(-1),
            ExtractedField::new("amount", amount).with_array_index(1),
        ])])
    }

    fn ready_session() -> ReviewSession {
        let mut session = ReviewSession::new("d1");
        let ticket = session.begin_load();
        assert!(session.complete_load(ticket, FetchOutcome::Loaded(document("10.00"))));
        session
    }

    #[test]
    fn not_found_before_any_load_is_awaiting() {
        let mut session = ReviewSession::new("d1");
        assert_eq!(session.state(), &SessionState::Idle);
        let ticket = session.begin_load();
        assert_eq!(session.state(), &SessionState::Loading);
        session.complete_load(ticket, FetchOutcome::NotFound);
        assert_eq!(session.state(), &SessionState::Awaiting);
    }

    #[test]
    fn server_error_is_a_fetch_failure() {
        let mut session = ReviewSession::new("d1");
        let ticket = session.begin_load();
        session.complete_load(ticket, FetchOutcome::Failed("500 Internal Server Error".to_string()));
        assert_eq!(
            session.state(),
            &SessionState::Error(ReviewError::Fetch("500 Internal Server Error".to_string()))
        );
    }

    #[test]
    fn awaiting_becomes_ready_on_result_ready() {
        let mut session = ReviewSession::new("d1");
        let ticket = session.begin_load();
        session.complete_load(ticket, FetchOutcome::NotFound);

        let MergeAction::Reload(ticket) = session.handle_event(&LiveEvent::result_ready("d1")) else {
            panic!("result-ready should reload");
        };
        assert_eq!(session.state(), &SessionState::Awaiting);
        session.complete_load(ticket, FetchOutcome::Loaded(document("10.00")));
        assert_eq!(session.state(), &SessionState::Ready);
        assert_eq!(session.view().rows.len(), 1);
        assert_eq!(session.edits().get("1__amount"), Some("10.00"));
    }

    #[test]
    fn result_ready_reseeds_from_fresh_data() {
        let mut session = ready_session();
        session.set_field("1__amount", "99.00").unwrap();
        let version = session.document_version();

        let MergeAction::Reload(ticket) = session.handle_event(&LiveEvent::result_ready("d1")) else {
            panic!("result-ready should reload");
        };
        assert_eq!(session.state(), &SessionState::Ready);
        assert_eq!(session.edits().get("1__amount"), Some("99.00"));

        session.complete_load(ticket, FetchOutcome::Loaded(document("12.00")));
        assert_eq!(session.state(), &SessionState::Ready);
        assert_eq!(session.document_version(), version + 1);
        assert_eq!(session.edits().get("1__amount"), Some("12.00"));
    }

    #[test]
    fn processing_started_changes_nothing() {
        let mut session = ready_session();
        session.set_field("invoice_no", "INV-2").unwrap();
        let before = session.clone();
        assert_eq!(session.handle_event(&LiveEvent::processing_started("d1")), MergeAction::Nothing);
        assert_eq!(session.state(), before.state());
        assert_eq!(session.edits(), before.edits());
    }

    #[test]
    fn pipeline_error_is_terminal_but_keeps_data() {
        let mut session = ready_session();
        session.handle_event(&LiveEvent::error("d1", "OCR crashed"));
        assert_eq!(
            session.state(),
            &SessionState::Error(ReviewError::Pipeline("OCR crashed".to_string()))
        );
        assert!(session.document().is_some());
        assert_eq!(session.view().header_fields.len(), 1);
        assert_eq!(session.handle_event(&LiveEvent::result_ready("d1")), MergeAction::Nothing);
        assert!(session.state().is_terminal());

        let ticket = session.begin_load();
        assert_eq!(session.state(), &SessionState::Loading);
        session.complete_load(ticket, FetchOutcome::Loaded(document("1.00")));
        assert_eq!(session.state(), &SessionState::Ready);
    }

    #[test]
    fn error_event_invalidates_fetch_in_flight() {
        let mut session = ready_session();
        let MergeAction::Reload(ticket) = session.handle_event(&LiveEvent::result_ready("d1")) else {
            panic!("result-ready should reload");
        };
        session.handle_event(&LiveEvent::error("d1", "late failure"));
        assert!(!session.complete_load(ticket, FetchOutcome::Loaded(document("2.00"))));
        assert_eq!(session.edits().get("1__amount"), Some("10.00"));
    }

    #[test]
    fn stale_tickets_are_ignored() {
        let mut session = ReviewSession::new("d1");
        let first = session.begin_load();
        let second = session.begin_load();
        assert!(!session.complete_load(first, FetchOutcome::Loaded(document("1.00"))));
        assert_eq!(session.state(), &SessionState::Loading);
        assert!(session.complete_load(second, FetchOutcome::Loaded(document("2.00"))));
        assert_eq!(session.edits().get("1__amount"), Some("2.00"));
    }

    #[test]
    fn events_for_other_documents_are_ignored() {
        let mut session = ready_session();
        assert_eq!(session.handle_event(&LiveEvent::error("d2", "boom")), MergeAction::Nothing);
        assert_eq!(session.state(), &SessionState::Ready);
    }

    #[test]
    fn not_found_on_reload_keeps_loaded_data() {
        let mut session = ready_session();
        let ticket = session.begin_reload();
        session.complete_load(ticket, FetchOutcome::NotFound);
        assert_eq!(session.state(), &SessionState::Ready);
        assert!(session.document().is_some());
    }

    #[test]
    fn reset_restores_seeded_values() {
        let mut session = ready_session();
        session.set_field("1__amount", "5.00").unwrap();
        session.reset_edits();
        assert_eq!(session.edits().get("1__amount"), Some("10.00"));
        assert_eq!(session.state(), &SessionState::Ready);
    }

    #[test]
    fn save_replaces_the_working_copy() {
        let mut session = ready_session();
        session.set_field("1__amount", "50.00").unwrap();
        let payload = session.build_save_payload().unwrap();
        assert_eq!(payload.pages[0].fields[1].typist_content.as_deref(), Some("50.00"));

        session.complete_save(payload.clone());
        assert_eq!(session.document(), Some(&payload));
        assert_eq!(session.edits().get("1__amount"), Some("50.00"));
        assert!(!session.edits().is_dirty());
    }

    #[test]
    fn no_payload_before_load() {
        assert!(ReviewSession::new("d1").build_save_payload().is_none());
    }

    #[test]
    fn only_approve_failures_mean_edits_were_saved() {
        assert!(ReviewError::ApproveFailed("x".to_string()).edits_persisted());
        assert!(!ReviewError::SaveFailed("x".to_string()).edits_persisted());
    }

    #[test]
    fn edits_made_during_a_save_are_kept() {
        let mut session = ready_session();
        session.set_field("1__amount", "50.00").unwrap();
        let payload = session.build_save_payload().unwrap();
        session.set_field("invoice_no", "INV-9").unwrap();

        session.complete_save(payload);
        assert_eq!(session.edits().get("1__amount"), Some("50.00"));
        assert_eq!(session.edits().get("invoice_no"), Some("INV-9"));
        let dirty = session.edits().dirty_keys().into_iter().map(|key| key.as_str()).collect::<Vec<_>>();
        assert_eq!(dirty, vec!["invoice_no"]);
    }
}
