//! Nostr relay client for one-shot queries.
//!
//! This crate provides:
//! - Message encoding and parsing (NIP-01 relay protocol)
//! - Single-subscription relay sessions with a timeout
//! - Concurrent fan-out of one filter across many relays
//! - Batched author queries for large key sets
//! - An in-memory relay for tests and offline runs
//!
//! # Example
//!
//! ```rust,no_run
//! use nostr_client::{Filter, FanOut, SessionConfig, WebSocketConnector, DEFAULT_RELAYS};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let fanout = FanOut::new(Arc::new(WebSocketConnector), SessionConfig::default());
//!     let relays: Vec<String> = DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect();
//!
//!     // Latest profile metadata, merged across relays
//!     let filter = Filter::new().kinds(vec![0]).limit(10);
//!     for event in fanout.fetch(&filter, &relays).await {
//!         println!("Received event: {}", event.id);
//!     }
//! }
//! ```

mod batch;
mod error;
mod fanout;
pub mod memory;
mod message;
mod session;
mod subscription;
mod transport;

// Re-export main types
pub use batch::{BatchController, DEFAULT_BATCH_SIZE};
pub use error::{ClientError, Result};
pub use fanout::{EventSet, FanOut, FetchReport};
pub use message::{ClientMessage, Filter, MessageError, RelayMessage};
pub use session::{EndpointReport, RelaySession, SessionConfig, SessionOutcome};
pub use subscription::{SessionState, generate_subscription_id};
pub use transport::{Connector, Transport, WebSocketConnector, WebSocketTransport, parse_relay_url};

/// Relays queried when none are configured.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_relays() {
        assert!(!DEFAULT_RELAYS.is_empty());
        for relay in DEFAULT_RELAYS {
            assert!(relay.starts_with("wss://"));
            assert!(parse_relay_url(relay).is_ok());
        }
    }
}
