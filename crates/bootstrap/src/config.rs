//! Bootstrap configuration.
//!
//! Stored as camelCase JSON. Every field is optional; missing fields take the
//! built-in defaults, which reproduce the stock bundle (nine root identities,
//! three public relays).

use nostr::DecodeOptions;
use nostr_client::{DEFAULT_BATCH_SIZE, DEFAULT_RELAYS, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Root identities whose contact lists seed the bundle.
pub const DEFAULT_ROOTS: &[&str] = &[
    "npub1g53mukxnjkcmr94fhryzkqutdz2ukq4ks0gvy5af25rgmwsl4ngq43drvk",
    "npub1v0lxxxxutpvrelsksy8cdhgfux9l6a42hsj2qzquu2zk7vc9qnkszrqj49",
    "npub180cvv07tjdrrgpa0j7j7tmnyl2yr6yr7l8j4s3evf6u64th6gkwsyjh6w6",
    "npub1xtscya34g58tk0z605fvr788k263gsu6cy9x0mhnm87echrgufzsevkk5s",
    "npub1s05p3ha7en49dv8429tkk07nnfa9pcwczkf5x5qrdraqshxdje9sq6eyhe",
    "npub13kwjkaunpmj5aslyd7hhwnwaqswmknj25dddglqztzz29pkavhaq25wg2a",
    "npub1995y964wmxl94crx3ksfley24szjr390skdd237ex9z7ttp5c9lqld8vtf",
    "npub1hu3hdctm5nkzd8gslnyedfr5ddz3z547jqcl5j88g4fame2jd08qh6h8nh",
    "npub1sn0wdenkukak0d9dfczzeacvhkrgz92ak56egt7vdgzn8pv2wfqqhrjdv9",
];

/// `limit` sent with the contact list query.
pub const DEFAULT_CONTACT_LIST_LIMIT: u64 = 100;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapConfig {
    /// Root identities as `npub` strings
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,

    /// Relay URLs queried for every filter
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,

    /// Seconds to wait for a relay to finish a subscription
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds to wait for a relay connection
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Authors per profile query
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_contact_list_limit")]
    pub contact_list_limit: u64,

    /// Verify the bech32 checksum of root identities
    #[serde(default)]
    pub verify_checksum: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            relays: default_relays(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            contact_list_limit: default_contact_list_limit(),
            verify_checksum: false,
        }
    }
}

impl BootstrapConfig {
    /// Check values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batchSize must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeoutSecs must be at least 1".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connectTimeoutSecs must be at least 1".into(),
            ));
        }
        if self.contact_list_limit == 0 {
            return Err(ConfigError::Invalid(
                "contactListLimit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::default().verify_checksum(self.verify_checksum)
    }
}

/// Load and validate a config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<BootstrapConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: BootstrapConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

fn default_roots() -> Vec<String> {
    DEFAULT_ROOTS.iter().map(|s| s.to_string()).collect()
}

fn default_relays() -> Vec<String> {
    DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_contact_list_limit() -> u64 {
    DEFAULT_CONTACT_LIST_LIMIT
}
