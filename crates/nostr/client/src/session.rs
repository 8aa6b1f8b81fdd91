//! One subscription against one relay.
//!
//! A [`RelaySession`] runs a single request/collect/close cycle: connect,
//! send REQ, gather EVENTs for its subscription until EOSE or the timeout,
//! send CLOSE and release the transport. Running out of time is a normal
//! ending; only transport failures mark the session as failed.

use crate::error::{ClientError, Result};
use crate::message::{ClientMessage, Filter, MessageError, RelayMessage};
use crate::subscription::{SessionState, generate_subscription_id};
use crate::transport::{Connector, Transport};
use nostr::Event;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Timeouts for a relay session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bounds the whole subscribed period, from REQ to EOSE
    pub timeout: Duration,
    /// Bounds the transport handshake
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of a session, successful or not.
#[derive(Debug)]
pub struct SessionOutcome {
    pub relay_url: String,
    pub subscription_id: String,
    /// Either `Closed` or `Failed`
    pub state: SessionState,
    /// Events in arrival order; empty when the session failed
    pub records: Vec<Event>,
    /// The timeout elapsed before EOSE
    pub timed_out: bool,
    pub error: Option<ClientError>,
}

/// Per-endpoint summary, without the events themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReport {
    pub relay_url: String,
    pub state: SessionState,
    pub received: usize,
    pub timed_out: bool,
    pub error: Option<String>,
}

impl SessionOutcome {
    /// Split into the summary and the collected events.
    pub fn into_parts(self) -> (EndpointReport, Vec<Event>) {
        let report = EndpointReport {
            relay_url: self.relay_url,
            state: self.state,
            received: self.records.len(),
            timed_out: self.timed_out,
            error: self.error.map(|e| e.to_string()),
        };
        (report, self.records)
    }
}

/// A single request/collect/close cycle against one relay.
pub struct RelaySession {
    relay_url: String,
    subscription_id: String,
    config: SessionConfig,
    state: SessionState,
}

impl RelaySession {
    pub fn new(relay_url: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            relay_url: relay_url.into(),
            subscription_id: generate_subscription_id(),
            config,
            state: SessionState::Idle,
        }
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion.
    ///
    /// Never returns an error: transport failures are logged and reported
    /// through [`SessionOutcome::state`] with no records.
    pub async fn run(mut self, connector: &dyn Connector, filter: &Filter) -> SessionOutcome {
        let mut records = Vec::new();

        match self.execute(connector, filter, &mut records).await {
            Ok(timed_out) => {
                info!(
                    "Subscription {} on {} closed with {} events{}",
                    self.subscription_id,
                    self.relay_url,
                    records.len(),
                    if timed_out { " (timed out)" } else { "" }
                );
                SessionOutcome {
                    relay_url: self.relay_url,
                    subscription_id: self.subscription_id,
                    state: self.state,
                    records,
                    timed_out,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    "Subscription {} on {} failed (filter: {:?}): {}",
                    self.subscription_id, self.relay_url, filter, e
                );
                self.transition(SessionState::Failed);
                SessionOutcome {
                    relay_url: self.relay_url,
                    subscription_id: self.subscription_id,
                    state: self.state,
                    records: Vec::new(),
                    timed_out: false,
                    error: Some(e),
                }
            }
        }
    }

    /// Returns whether the timeout cut collection short.
    async fn execute(
        &mut self,
        connector: &dyn Connector,
        filter: &Filter,
        records: &mut Vec<Event>,
    ) -> Result<bool> {
        self.transition(SessionState::Connecting);

        let mut transport = match timeout(
            self.config.connect_timeout,
            connector.connect(&self.relay_url),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ClientError::Timeout(format!(
                    "Connection timeout after {:?}",
                    self.config.connect_timeout
                )));
            }
        };

        let req = ClientMessage::Req {
            subscription_id: self.subscription_id.clone(),
            filters: vec![filter.clone()],
        };
        let req = req
            .to_json()
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        transport.send(req).await?;
        self.transition(SessionState::Subscribed);

        let timed_out = match timeout(
            self.config.timeout,
            self.collect(transport.as_mut(), records),
        )
        .await
        {
            Ok(result) => {
                result?;
                false
            }
            Err(_) => {
                debug!(
                    "Subscription {} on {} timed out after {:?}",
                    self.subscription_id, self.relay_url, self.config.timeout
                );
                true
            }
        };

        // A relay that stops reading must not hold the session open; the
        // transport is dropped either way.
        if timeout(self.config.connect_timeout, self.shutdown(transport.as_mut()))
            .await
            .is_err()
        {
            debug!(
                "Closing {} on {} did not finish within {:?}",
                self.subscription_id, self.relay_url, self.config.connect_timeout
            );
        }
        drop(transport);
        self.transition(SessionState::Closed);

        Ok(timed_out)
    }

    /// Gather events until EOSE, CLOSED or the relay hangs up.
    async fn collect(
        &mut self,
        transport: &mut dyn Transport,
        records: &mut Vec<Event>,
    ) -> Result<()> {
        while let Some(text) = transport.recv().await? {
            match RelayMessage::from_json(&text) {
                Ok(RelayMessage::Event {
                    subscription_id,
                    event,
                }) if subscription_id == self.subscription_id => {
                    records.push(event);
                }
                Ok(RelayMessage::Eose { subscription_id })
                    if subscription_id == self.subscription_id =>
                {
                    self.transition(SessionState::Draining);
                    return Ok(());
                }
                Ok(RelayMessage::Closed {
                    subscription_id,
                    message,
                }) if subscription_id == self.subscription_id => {
                    warn!(
                        "Subscription {} closed by {}: {}",
                        subscription_id, self.relay_url, message
                    );
                    return Ok(());
                }
                Ok(RelayMessage::Notice { message }) => {
                    info!("Notice from {}: {}", self.relay_url, message);
                }
                Ok(other) => {
                    debug!("Ignoring message from {}: {:?}", self.relay_url, other);
                }
                Err(MessageError::UnknownType(kind)) => {
                    debug!("Ignoring {} message from {}", kind, self.relay_url);
                }
                Err(e) => {
                    warn!("Dropping malformed message from {}: {}", self.relay_url, e);
                }
            }
        }

        debug!(
            "Relay {} ended the stream before EOSE for {}",
            self.relay_url, self.subscription_id
        );
        Ok(())
    }

    /// Send CLOSE and release the transport. Failures here do not change the
    /// outcome; the events are already collected.
    async fn shutdown(&self, transport: &mut dyn Transport) {
        let close = ClientMessage::Close {
            subscription_id: self.subscription_id.clone(),
        };
        match close.to_json() {
            Ok(text) => {
                if let Err(e) = transport.send(text).await {
                    debug!("Failed to send CLOSE to {}: {}", self.relay_url, e);
                }
            }
            Err(e) => debug!("Failed to encode CLOSE: {}", e),
        }

        if let Err(e) = transport.close().await {
            debug!("Failed to close transport to {}: {}", self.relay_url, e);
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            "Session {} on {}: {:?} -> {:?}",
            self.subscription_id, self.relay_url, self.state, next
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConnector, MemoryRelay, StreamEnd};
    use std::sync::Arc;

    const RELAY: &str = "wss://relay.test";

    fn event(id: &str, kind: u16) -> Event {
        Event {
            id: id.to_string(),
            pubkey: "aa".repeat(32),
            created_at: Some(100),
            kind,
            ..Default::default()
        }
    }

    fn quick() -> SessionConfig {
        SessionConfig {
            timeout: Duration::from_millis(200),
            connect_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_collects_until_eose() {
        let relay = MemoryRelay::new().with_events(vec![event("1", 0), event("2", 0), event("3", 3)]);
        let connector = MemoryConnector::new().with_relay(RELAY, relay);

        let session = RelaySession::new(RELAY, quick());
        assert_eq!(session.state(), SessionState::Idle);
        let sub_id = session.subscription_id().to_string();

        let outcome = session
            .run(&connector, &Filter::new().kinds(vec![0]))
            .await;

        assert_eq!(outcome.state, SessionState::Closed);
        assert!(!outcome.timed_out);
        assert!(outcome.error.is_none());
        let ids: Vec<&str> = outcome.records.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        // CLOSE is sent for the same subscription
        assert_eq!(
            connector.closes().await,
            vec![(RELAY.to_string(), sub_id)]
        );
    }

    #[tokio::test]
    async fn test_timeout_keeps_collected_records() {
        let relay = MemoryRelay::new()
            .with_events(vec![event("1", 0), event("2", 0)])
            .ending_with(StreamEnd::Hang);
        let connector = MemoryConnector::new().with_relay(RELAY, relay);

        let outcome = RelaySession::new(RELAY, quick())
            .run(&connector, &Filter::new())
            .await;

        assert_eq!(outcome.state, SessionState::Closed);
        assert!(outcome.timed_out);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(connector.closes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_fails() {
        let connector = MemoryConnector::new().with_relay(RELAY, MemoryRelay::unreachable());

        let outcome = RelaySession::new(RELAY, quick())
            .run(&connector, &Filter::new())
            .await;

        assert_eq!(outcome.state, SessionState::Failed);
        assert!(outcome.records.is_empty());
        assert!(matches!(outcome.error, Some(ClientError::Connection(_))));
    }

    #[tokio::test]
    async fn test_socket_error_discards_records() {
        let relay = MemoryRelay::new()
            .with_events(vec![event("1", 0)])
            .ending_with(StreamEnd::Error);
        let connector = MemoryConnector::new().with_relay(RELAY, relay);

        let outcome = RelaySession::new(RELAY, quick())
            .run(&connector, &Filter::new())
            .await;

        assert_eq!(outcome.state, SessionState::Failed);
        assert!(outcome.records.is_empty());
        assert!(matches!(outcome.error, Some(ClientError::WebSocket(_))));
    }

    #[tokio::test]
    async fn test_disconnect_before_eose_is_not_a_failure() {
        let relay = MemoryRelay::new()
            .with_events(vec![event("1", 0)])
            .ending_with(StreamEnd::Disconnect);
        let connector = MemoryConnector::new().with_relay(RELAY, relay);

        let outcome = RelaySession::new(RELAY, quick())
            .run(&connector, &Filter::new())
            .await;

        assert_eq!(outcome.state, SessionState::Closed);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_and_foreign_messages_are_skipped() {
        let foreign = serde_json::json!(["EVENT", "someone-else", event("x", 0)]).to_string();
        let relay = MemoryRelay::new()
            .with_preamble(vec![
                "not json".to_string(),
                r#"["EVENT","{sub}",{"content":"missing id"}]"#.to_string(),
                r#"["NOTICE","slow down"]"#.to_string(),
                r#"["AUTH","challenge"]"#.to_string(),
                r#"["EOSE","someone-else"]"#.to_string(),
                foreign,
            ])
            .with_events(vec![event("1", 0)]);
        let connector = MemoryConnector::new().with_relay(RELAY, relay);

        let outcome = RelaySession::new(RELAY, quick())
            .run(&connector, &Filter::new())
            .await;

        assert_eq!(outcome.state, SessionState::Closed);
        assert!(!outcome.timed_out);
        let ids: Vec<&str> = outcome.records.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[tokio::test]
    async fn test_closed_by_relay_ends_collection() {
        let relay = MemoryRelay::new()
            .with_preamble(vec![r#"["CLOSED","{sub}","error: shutting down"]"#])
            .with_events(vec![event("1", 0)])
            .ending_with(StreamEnd::Hang);
        let connector = MemoryConnector::new().with_relay(RELAY, relay);

        let outcome = RelaySession::new(RELAY, quick())
            .run(&connector, &Filter::new())
            .await;

        assert_eq!(outcome.state, SessionState::Closed);
        assert!(!outcome.timed_out);
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        struct StallingConnector;

        #[async_trait::async_trait]
        impl Connector for StallingConnector {
            async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>> {
                std::future::pending::<()>().await;
                Err(ClientError::Connection("unreachable".to_string()))
            }
        }

        let connector: Arc<dyn Connector> = Arc::new(StallingConnector);
        let outcome = RelaySession::new(RELAY, quick())
            .run(connector.as_ref(), &Filter::new())
            .await;

        assert_eq!(outcome.state, SessionState::Failed);
        assert!(matches!(outcome.error, Some(ClientError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_stuck_close_does_not_hold_session() {
        // Accepts the REQ, then never answers and never drains another frame.
        struct StuckTransport {
            sent: usize,
        }

        #[async_trait::async_trait]
        impl Transport for StuckTransport {
            async fn send(&mut self, _text: String) -> Result<()> {
                self.sent += 1;
                if self.sent > 1 {
                    std::future::pending::<()>().await;
                }
                Ok(())
            }

            async fn recv(&mut self) -> Result<Option<String>> {
                std::future::pending::<()>().await;
                Ok(None)
            }

            async fn close(&mut self) -> Result<()> {
                std::future::pending::<()>().await;
                Ok(())
            }
        }

        struct StuckConnector;

        #[async_trait::async_trait]
        impl Connector for StuckConnector {
            async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>> {
                Ok(Box::new(StuckTransport { sent: 0 }))
            }
        }

        let config = SessionConfig {
            timeout: Duration::from_millis(100),
            connect_timeout: Duration::from_millis(100),
        };
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            RelaySession::new(RELAY, config).run(&StuckConnector, &Filter::new()),
        )
        .await
        .expect("session should finish despite a stuck CLOSE");

        assert_eq!(outcome.state, SessionState::Closed);
        assert!(outcome.timed_out);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_into_parts() {
        let outcome = SessionOutcome {
            relay_url: RELAY.to_string(),
            subscription_id: "s".to_string(),
            state: SessionState::Failed,
            records: vec![],
            timed_out: false,
            error: Some(ClientError::Connection("refused".to_string())),
        };

        let (report, records) = outcome.into_parts();
        assert!(records.is_empty());
        assert_eq!(report.state, SessionState::Failed);
        assert_eq!(report.error.as_deref(), Some("Connection error: refused"));
    }
}
