//! Two-phase discovery: contact lists of the roots, then profiles of
//! everyone they follow.
//!
//! Phase A fetches kind 3 contact lists for the decoded root keys and grows
//! the discovered set from their `p` tags. Phase B fetches kind 0 profiles
//! for the whole discovered set in batches. Relay failures only shrink the
//! result; the run itself fails only on missing inputs.

use crate::config::{BootstrapConfig, DEFAULT_CONTACT_LIST_LIMIT};
use nostr::{
    DecodeOptions, Event, KIND_CONTACTS, KIND_METADATA, NPUB_PREFIX, PublicKey, contacts, nip19,
    sort_chronologically,
};
use nostr_client::{BatchController, Connector, FanOut};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop a run before any relay is contacted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no relays configured")]
    NoEndpoints,

    #[error("no root identities configured")]
    NoRoots,
}

/// Keys discovered so far, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredSet {
    seen: HashSet<PublicKey>,
    keys: Vec<PublicKey>,
}

impl DiscoveredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the key was already present.
    pub fn insert(&mut self, key: PublicKey) -> bool {
        if !self.seen.insert(key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.seen.contains(key)
    }

    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub contact_lists: usize,
    pub profiles: usize,
    pub unique_users: usize,
}

/// Everything one run produced.
#[derive(Debug, Default)]
pub struct DiscoveryOutput {
    /// Phase A records, oldest first
    pub contact_lists: Vec<Event>,
    /// Phase B records, oldest first
    pub profiles: Vec<Event>,
    pub discovered: DiscoveredSet,
}

impl DiscoveryOutput {
    /// Contact lists followed by profiles.
    pub fn records(&self) -> impl Iterator<Item = &Event> {
        self.contact_lists.iter().chain(self.profiles.iter())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            contact_lists: self.contact_lists.len(),
            profiles: self.profiles.len(),
            unique_users: self.discovered.len(),
        }
    }
}

/// Decode root identifiers, dropping (and logging) the ones that fail.
/// Duplicates collapse to their first occurrence.
pub fn decode_roots(roots: &[String], options: DecodeOptions) -> Vec<PublicKey> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for root in roots {
        match nip19::decode(NPUB_PREFIX, root, options) {
            Ok(key) => {
                debug!("  {} -> {}", root, key);
                if seen.insert(key) {
                    keys.push(key);
                }
            }
            Err(e) => warn!("Error decoding {}: {}", root, e),
        }
    }

    keys
}

/// Seed keys first, then every valid `p` tag value in record order.
pub fn discover(seeds: &[PublicKey], contact_lists: &[Event]) -> DiscoveredSet {
    let mut discovered = DiscoveredSet::new();
    for seed in seeds {
        discovered.insert(*seed);
    }

    for event in contact_lists {
        for contact in contacts(event) {
            match PublicKey::from_hex(&contact.pubkey) {
                Ok(key) => {
                    discovered.insert(key);
                }
                Err(e) => debug!(
                    "Skipping p tag {:?} in event {}: {}",
                    contact.pubkey, event.id, e
                ),
            }
        }
    }

    discovered
}

/// Runs the two discovery phases over a fan-out.
pub struct DiscoveryPipeline {
    fanout: FanOut,
    batch_size: usize,
    contact_list_limit: u64,
    decode_options: DecodeOptions,
}

impl DiscoveryPipeline {
    pub fn new(fanout: FanOut, batch_size: usize) -> Self {
        Self {
            fanout,
            batch_size: batch_size.max(1),
            contact_list_limit: DEFAULT_CONTACT_LIST_LIMIT,
            decode_options: DecodeOptions::default(),
        }
    }

    /// Build a pipeline with the timeouts, batch size and decoding policy
    /// from `config`.
    pub fn from_config(connector: Arc<dyn Connector>, config: &BootstrapConfig) -> Self {
        let fanout = FanOut::new(connector, config.session_config());
        Self::new(fanout, config.batch_size)
            .contact_list_limit(config.contact_list_limit)
            .decode_options(config.decode_options())
    }

    pub fn contact_list_limit(mut self, limit: u64) -> Self {
        self.contact_list_limit = limit;
        self
    }

    pub fn decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode_options = options;
        self
    }

    /// Run both phases for `roots` against `relays`.
    pub async fn run(
        &self,
        roots: &[String],
        relays: &[String],
    ) -> Result<DiscoveryOutput, PipelineError> {
        if relays.is_empty() {
            return Err(PipelineError::NoEndpoints);
        }
        if roots.is_empty() {
            return Err(PipelineError::NoRoots);
        }

        info!("Converting {} npubs to hex pubkeys...", roots.len());
        let seeds = decode_roots(roots, self.decode_options);
        if seeds.is_empty() {
            warn!("No root identity could be decoded; nothing to fetch");
            return Ok(DiscoveryOutput::default());
        }

        info!(
            "Fetching kind {} (contact lists) for {} root users...",
            KIND_CONTACTS,
            seeds.len()
        );
        let mut contact_lists = BatchController::new(&self.fanout, self.batch_size)
            .limit(Some(self.contact_list_limit))
            .fetch_for_keys(&[KIND_CONTACTS], &seeds, relays)
            .await;
        info!("  Found {} contact list events", contact_lists.len());

        let discovered = discover(&seeds, &contact_lists);
        info!("  Discovered {} unique pubkeys", discovered.len());

        info!(
            "Fetching kind {} (profiles) for {} users...",
            KIND_METADATA,
            discovered.len()
        );
        let mut profiles = BatchController::new(&self.fanout, self.batch_size)
            .fetch_for_keys(&[KIND_METADATA], discovered.keys(), relays)
            .await;
        info!("  Total profiles: {}", profiles.len());

        sort_chronologically(&mut contact_lists);
        sort_chronologically(&mut profiles);

        Ok(DiscoveryOutput {
            contact_lists,
            profiles,
            discovered,
        })
    }
}
