//! Profile bootstrap bundle generation.
//!
//! Starting from a handful of root identities, the bootstrap run
//! fetches their contact lists from several relays, follows the `p` tags one
//! hop, and fetches profile metadata for everyone discovered. The records are
//! emitted as JSONL: contact lists first, then profiles, each oldest first.
//!
//! # Example
//!
//! ```no_run
//! use nostr_client::WebSocketConnector;
//! use profile_bootstrap::{BootstrapConfig, DiscoveryPipeline, write_jsonl};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = BootstrapConfig::default();
//! let pipeline = DiscoveryPipeline::from_config(Arc::new(WebSocketConnector), &config);
//! let output = pipeline.run(&config.roots, &config.relays).await?;
//! write_jsonl(std::io::stdout().lock(), output.records())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod output;
pub mod pipeline;

pub use config::{BootstrapConfig, ConfigError, DEFAULT_ROOTS, load_config};
pub use output::{OutputError, write_jsonl};
pub use pipeline::{
    DiscoveredSet, DiscoveryOutput, DiscoveryPipeline, PipelineError, Summary, decode_roots,
    discover,
};
