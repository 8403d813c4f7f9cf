//! Live-update channel: a `text/event-stream` subscription that reconnects
//! after failures and yields parsed [`LiveEvent`]s in arrival order.

use std::time::Duration;

use common::live_event::LiveEvent;
use futures_util::StreamExt;
use reqwest::{Client, header};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

const CHANNEL_CAPACITY: usize = 64;

/// One dispatched SSE message before its payload is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental `text/event-stream` parser. Chunks may split lines (and UTF-8
/// sequences) anywhere.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    retry: Option<Duration>,
}

impl EventStreamDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawEvent> {
        self.pending.extend_from_slice(chunk);
        let mut dispatched = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if let Some(event) = self.process_line(line) {
                dispatched.push(event);
            }
        }
        dispatched
    }

    /// Reconnection delay last requested by the server.
    pub fn retry_hint(&self) -> Option<Duration> {
        self.retry
    }

    fn process_line(&mut self, line: &str) -> Option<RawEvent> {
        if line.is_empty() {
            let event = self.event.take();
            if self.data.is_empty() {
                return None;
            }
            let data = std::mem::take(&mut self.data).join("\n");
            return Some(RawEvent { event, data });
        }
        // comments carry keep-alives
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
        None
    }
}

/// Interprets a message payload. Malformed payloads are logged and dropped.
pub fn decode_live_event(raw: &RawEvent) -> Option<LiveEvent> {
    match LiveEvent::parse(&raw.data) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("dropping malformed live event {:?}: {}", raw.event, e);
            None
        }
    }
}

/// An open live-update channel. Dropping it stops the background task.
pub struct LiveUpdateSubscription {
    rx: mpsc::Receiver<LiveEvent>,
    connected: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl LiveUpdateSubscription {
    /// Events for a single document.
    pub fn document(config: &ClientConfig, doc_id: &str) -> Result<Self, ClientError> {
        Self::open(config, config.endpoints().document_events(doc_id))
    }

    /// Events for every document.
    pub fn all(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::open(config, config.endpoints().events())
    }

    fn open(config: &ClientConfig, url: String) -> Result<Self, ClientError> {
        // no overall timeout: the stream stays open indefinitely
        let http = Client::builder().connect_timeout(config.request_timeout).build()?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (connected_tx, connected) = watch::channel(false);
        let task = tokio::spawn(run_subscription(http, url, config.reconnect_delay, tx, connected_tx));
        Ok(Self { rx, connected, task })
    }

    /// Resolves once the server has accepted the stream. Events published
    /// before that point are not delivered.
    pub async fn wait_connected(&mut self) {
        let _ = self.connected.wait_for(|connected| *connected).await;
    }

    /// Next event, or `None` once the subscription has been shut down.
    pub async fn next(&mut self) -> Option<LiveEvent> {
        self.rx.recv().await
    }

    /// Stops the background task.
    pub fn close(self) {}
}

impl Drop for LiveUpdateSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_subscription(
    http: Client,
    url: String,
    reconnect_delay: Duration,
    tx: mpsc::Sender<LiveEvent>,
    connected: watch::Sender<bool>,
) {
    let mut delay = reconnect_delay;
    loop {
        match forward_events(&http, &url, &tx, &connected, &mut delay).await {
            Ok(()) => debug!("event stream {} ended", url),
            Err(e) => warn!("event stream {} failed: {}", url, e),
        }
        connected.send_replace(false);
        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(delay).await;
        info!("reconnecting to {}", url);
    }
}

async fn forward_events(
    http: &Client,
    url: &str,
    tx: &mpsc::Sender<LiveEvent>,
    connected: &watch::Sender<bool>,
    delay: &mut Duration,
) -> Result<(), ClientError> {
    let response = http.get(url).header(header::ACCEPT, "text/event-stream").send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::from_status(status, url, body));
    }
    connected.send_replace(true);
    debug!("event stream {} connected", url);

    let mut decoder = EventStreamDecoder::default();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for raw in decoder.push(&chunk) {
            let Some(event) = decode_live_event(&raw) else {
                continue;
            };
            if tx.send(event).await.is_err() {
                return Ok(());
            }
        }
        if let Some(retry) = decoder.retry_hint() {
            *delay = retry;
        }
    }
    Ok(())
}
