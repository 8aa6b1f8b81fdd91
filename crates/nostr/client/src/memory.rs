//! In-memory relays for tests and offline runs.
//!
//! A [`MemoryConnector`] maps relay URLs to scripted [`MemoryRelay`]s. Each
//! relay answers a REQ with its stored events that match the filter, then
//! ends the subscription the way its [`StreamEnd`] says. Every REQ and CLOSE
//! received is recorded so callers can assert on what was sent.

use crate::error::{ClientError, Result};
use crate::message::Filter;
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use nostr::Event;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How a memory relay finishes a subscription after sending its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamEnd {
    /// Send EOSE and keep the connection open
    #[default]
    Eose,
    /// Never send EOSE; the client has to time out
    Hang,
    /// Close the connection without EOSE
    Disconnect,
    /// Fail the connection with a socket error
    Error,
}

/// Scripted behaviour of one in-memory relay.
#[derive(Debug, Clone, Default)]
pub struct MemoryRelay {
    events: Vec<Event>,
    preamble: Vec<String>,
    end: StreamEnd,
    refuse: bool,
    delay: Option<Duration>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A relay that refuses every connection.
    pub fn unreachable() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Store events served to matching subscriptions.
    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }

    /// Raw frames sent before any event. `{sub}` is replaced by the
    /// subscription id of the request being answered.
    pub fn with_preamble(mut self, frames: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.preamble.extend(frames.into_iter().map(Into::into));
        self
    }

    pub fn ending_with(mut self, end: StreamEnd) -> Self {
        self.end = end;
        self
    }

    /// Wait before delivering each frame.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A REQ as seen by a memory relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub relay_url: String,
    pub subscription_id: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Default)]
struct Journal {
    requests: Vec<RecordedRequest>,
    closes: Vec<(String, String)>,
    connections: usize,
}

/// Connector serving scripted relays from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    relays: HashMap<String, MemoryRelay>,
    journal: Arc<Mutex<Journal>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relay under a URL. Unregistered URLs refuse connections.
    pub fn with_relay(mut self, url: impl Into<String>, relay: MemoryRelay) -> Self {
        self.relays.insert(url.into(), relay);
        self
    }

    /// Every REQ received so far, across all relays, in arrival order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.journal.lock().await.requests.clone()
    }

    /// `(relay_url, subscription_id)` for every CLOSE received.
    pub async fn closes(&self) -> Vec<(String, String)> {
        self.journal.lock().await.closes.clone()
    }

    /// Number of successful connections.
    pub async fn connection_count(&self) -> usize {
        self.journal.lock().await.connections
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        let relay = match self.relays.get(url) {
            Some(relay) if !relay.refuse => relay.clone(),
            _ => {
                return Err(ClientError::Connection(format!(
                    "connection refused: {}",
                    url
                )));
            }
        };

        self.journal.lock().await.connections += 1;

        Ok(Box::new(MemoryTransport {
            url: url.to_string(),
            relay,
            outbox: VecDeque::new(),
            answered: false,
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct MemoryTransport {
    url: String,
    relay: MemoryRelay,
    outbox: VecDeque<String>,
    answered: bool,
    journal: Arc<Mutex<Journal>>,
}

impl MemoryTransport {
    fn answer(&mut self, subscription_id: &str, filters: &[Filter]) {
        for frame in &self.relay.preamble {
            self.outbox.push_back(frame.replace("{sub}", subscription_id));
        }

        for event in &self.relay.events {
            if filters.iter().any(|f| f.matches(event)) {
                let frame = serde_json::json!(["EVENT", subscription_id, event]);
                self.outbox.push_back(frame.to_string());
            }
        }

        if self.relay.end == StreamEnd::Eose {
            let frame = serde_json::json!(["EOSE", subscription_id]);
            self.outbox.push_back(frame.to_string());
        }

        self.answered = true;
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        let arr: Vec<Value> = serde_json::from_str(&text)?;
        let command = arr.first().and_then(Value::as_str).unwrap_or_default();
        let subscription_id = arr
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match command {
            "REQ" => {
                let filters = arr
                    .iter()
                    .skip(2)
                    .map(|v| serde_json::from_value::<Filter>(v.clone()))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                self.answer(&subscription_id, &filters);
                self.journal.lock().await.requests.push(RecordedRequest {
                    relay_url: self.url.clone(),
                    subscription_id,
                    filters,
                });
            }
            "CLOSE" => {
                self.journal
                    .lock()
                    .await
                    .closes
                    .push((self.url.clone(), subscription_id));
            }
            _ => {}
        }

        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        if let Some(frame) = self.outbox.pop_front() {
            if let Some(delay) = self.relay.delay {
                tokio::time::sleep(delay).await;
            }
            return Ok(Some(frame));
        }

        if !self.answered {
            // Nothing requested yet; a real relay would stay silent too.
            std::future::pending::<()>().await;
        }

        match self.relay.end {
            StreamEnd::Eose | StreamEnd::Hang => {
                std::future::pending::<()>().await;
                Ok(None)
            }
            StreamEnd::Disconnect => Ok(None),
            StreamEnd::Error => Err(ClientError::WebSocket(format!(
                "connection reset by {}",
                self.url
            ))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.outbox.clear();
        Ok(())
    }
}
