//! Batched queries over large author sets.
//!
//! Relays cap how many authors one filter may carry, so a long key list is
//! split into chunks of at most `batch_size` keys. Each chunk becomes one
//! fan-out across all relays; chunks run one after another.

use crate::fanout::FanOut;
use crate::message::Filter;
use nostr::{Event, PublicKey};
use tracing::{debug, info};

/// Authors per filter unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Splits author queries into chunks and fans each one out in turn.
pub struct BatchController<'a> {
    fanout: &'a FanOut,
    batch_size: usize,
    limit: Option<u64>,
}

impl<'a> BatchController<'a> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(fanout: &'a FanOut, batch_size: usize) -> Self {
        Self {
            fanout,
            batch_size: batch_size.max(1),
            limit: None,
        }
    }

    /// Use a fixed `limit` on every filter instead of the chunk size.
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// One filter per chunk of `keys`, in order. Every key lands in exactly
    /// one filter.
    pub fn plan_filters(&self, kinds: &[u16], keys: &[PublicKey]) -> Vec<Filter> {
        keys.chunks(self.batch_size)
            .map(|chunk| {
                let limit = self.limit.unwrap_or(chunk.len() as u64);
                Filter::new()
                    .kinds(kinds.to_vec())
                    .author_keys(chunk)
                    .limit(limit)
            })
            .collect()
    }

    /// Fetch events of `kinds` authored by `keys` from all `relays`.
    ///
    /// Results are concatenated in batch order. Events are deduplicated
    /// within a batch by the fan-out, not across batches; since batches
    /// have disjoint authors the overlap is empty for well-behaved relays.
    pub async fn fetch_for_keys(
        &self,
        kinds: &[u16],
        keys: &[PublicKey],
        relays: &[String],
    ) -> Vec<Event> {
        let filters = self.plan_filters(kinds, keys);
        let total = filters.len();
        let mut records = Vec::new();

        for (index, filter) in filters.iter().enumerate() {
            debug!(
                "Batch {}/{}: {} authors, kinds {:?}",
                index + 1,
                total,
                filter.author_count(),
                kinds
            );

            let batch = self.fanout.fetch(filter, relays).await;
            info!(
                "Fetched {} records (batch {}/{})",
                batch.len(),
                index + 1,
                total
            );
            records.extend(batch);
        }

        records
    }
}
