//! Fan-out of live-update events to SSE clients.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use common::live_event::LiveEvent;
use futures::stream::Stream;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<LiveEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        info!("event broadcaster initialized with capacity {}", capacity);
        Self { tx }
    }

    /// Sends to every connected client. Nobody listening is not an error.
    pub fn broadcast_lossy(&self, event: LiveEvent) {
        match self.tx.send(event) {
            Ok(count) => debug!("broadcast event to {} clients", count),
            Err(_) => debug!("no event clients connected"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

/// SSE stream over a subscription. With `doc_id` set only that document's events pass.
pub fn live_event_stream(
    rx: broadcast::Receiver<LiveEvent>,
    doc_id: Option<String>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(move |result| {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                // lagged receivers skip ahead
                warn!("event client lagged: {:?}", e);
                return None;
            }
        };
        if let Some(doc_id) = &doc_id {
            if !event.concerns(doc_id) {
                return None;
            }
        }
        let data = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().event(event.event.as_str()).data(data)))
    })
}

pub fn live_event_sse(
    rx: broadcast::Receiver<LiveEvent>,
    doc_id: Option<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("new event client connected (document: {:?})", doc_id);
    Sse::new(live_event_stream(rx, doc_id)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
