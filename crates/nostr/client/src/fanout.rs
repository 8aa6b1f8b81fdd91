//! Scatter one filter across many relays and merge the answers.
//!
//! Each relay gets its own [`RelaySession`] running as a tokio task. All
//! tasks are spawned together and joined together; a failing relay never
//! cancels its siblings. Events are merged into one set keyed by event id,
//! the first copy seen wins.

use crate::message::Filter;
use crate::session::{EndpointReport, RelaySession, SessionConfig};
use crate::subscription::SessionState;
use crate::transport::Connector;
use futures::future::join_all;
use nostr::Event;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Events deduplicated by id, in first-seen order.
#[derive(Debug, Default)]
pub struct EventSet {
    seen: HashSet<String>,
    events: Vec<Event>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event; returns false if one with the same id is already held.
    pub fn insert(&mut self, event: Event) -> bool {
        if !self.seen.insert(event.id.clone()) {
            return false;
        }
        self.events.push(event);
        true
    }

    /// Insert many events; returns how many were new.
    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
        let mut added = 0;
        for event in events {
            if self.insert(event) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Merged events plus what happened on each relay.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub records: Vec<Event>,
    pub endpoints: Vec<EndpointReport>,
}

impl FetchReport {
    /// Relays whose session ended in `Failed`.
    pub fn failed(&self) -> impl Iterator<Item = &EndpointReport> {
        self.endpoints
            .iter()
            .filter(|e| e.state == SessionState::Failed)
    }
}

/// Runs one filter against a set of relays concurrently.
#[derive(Clone)]
pub struct FanOut {
    connector: Arc<dyn Connector>,
    config: SessionConfig,
}

impl FanOut {
    pub fn new(connector: Arc<dyn Connector>, config: SessionConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetch events matching `filter` from every relay, deduplicated by id.
    pub async fn fetch(&self, filter: &Filter, relays: &[String]) -> Vec<Event> {
        self.fetch_detailed(filter, relays).await.records
    }

    /// Like [`FanOut::fetch`], also reporting the outcome for each relay.
    pub async fn fetch_detailed(&self, filter: &Filter, relays: &[String]) -> FetchReport {
        let mut unique = HashSet::new();
        let relays: Vec<&String> = relays.iter().filter(|r| unique.insert(*r)).collect();

        if relays.is_empty() {
            return FetchReport::default();
        }

        let merged = Arc::new(Mutex::new(EventSet::new()));

        let handles = relays.iter().map(|url| {
            let url = (*url).clone();
            let connector = Arc::clone(&self.connector);
            let config = self.config.clone();
            let filter = filter.clone();
            let merged = Arc::clone(&merged);

            tokio::spawn(async move {
                let outcome = RelaySession::new(url, config)
                    .run(connector.as_ref(), &filter)
                    .await;
                let (report, records) = outcome.into_parts();

                let received = records.len();
                let added = merged.lock().await.extend(records);
                if added < received {
                    debug!(
                        "Discarded {} duplicate events from {}",
                        received - added,
                        report.relay_url
                    );
                }

                report
            })
        });

        let results = join_all(handles).await;

        let endpoints: Vec<EndpointReport> = results
            .into_iter()
            .zip(relays)
            .map(|(result, url)| match result {
                Ok(report) => report,
                Err(e) => {
                    warn!("Session task for {} did not complete: {}", url, e);
                    EndpointReport {
                        relay_url: url.clone(),
                        state: SessionState::Failed,
                        received: 0,
                        timed_out: false,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let records = std::mem::take(&mut *merged.lock().await).into_events();

        info!(
            "Fetched {} unique events from {} relays ({} failed)",
            records.len(),
            endpoints.len(),
            endpoints
                .iter()
                .filter(|e| e.state == SessionState::Failed)
                .count()
        );

        FetchReport { records, endpoints }
    }
}
