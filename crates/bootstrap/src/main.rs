//! `profile-bootstrap` binary entrypoint.
//!
//! Writes the bundle as JSONL to stdout (or `--output`); progress goes to the
//! log on stderr.
//!
//! ```bash
//! # Stock roots and relays
//! cargo run -p profile-bootstrap > profile-bootstrap.jsonl
//!
//! # Custom roots against a local relay
//! cargo run -p profile-bootstrap -- \
//!   --root npub1... --relay ws://127.0.0.1:7000 --timeout 5
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nostr_client::WebSocketConnector;
use profile_bootstrap::{BootstrapConfig, DiscoveryPipeline, load_config, write_jsonl};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "profile-bootstrap",
    about = "Fetch contact lists and profiles for a set of root identities",
    version
)]
struct Cli {
    /// JSON config file (camelCase keys); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root identity as an npub (repeatable; replaces configured roots)
    #[arg(long = "root")]
    roots: Vec<String>,

    /// Relay URL (repeatable; replaces configured relays)
    #[arg(long = "relay")]
    relays: Vec<String>,

    /// Seconds to wait for each relay subscription
    #[arg(long)]
    timeout: Option<u64>,

    /// Authors per profile query
    #[arg(long)]
    batch_size: Option<usize>,

    /// Write JSONL here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Reject root identities with a bad bech32 checksum
    #[arg(long)]
    verify_checksum: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<(BootstrapConfig, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => BootstrapConfig::default(),
        };

        if !self.roots.is_empty() {
            config.roots = self.roots;
        }
        if !self.relays.is_empty() {
            config.relays = self.relays;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.verify_checksum {
            config.verify_checksum = true;
        }

        config.validate().context("invalid settings")?;
        Ok((config, self.output))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    // Process-wide TLS provider for wss:// relays
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let (config, output) = cli.into_config()?;

    let pipeline = DiscoveryPipeline::from_config(Arc::new(WebSocketConnector), &config);
    let result = pipeline
        .run(&config.roots, &config.relays)
        .await
        .context("bootstrap run failed")?;

    let written = match &output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_jsonl(BufWriter::new(file), result.records())?
        }
        None => write_jsonl(std::io::stdout().lock(), result.records())?,
    };

    let summary = result.summary();
    info!("Generated profile bootstrap with {} events", written);
    info!("  - {} contact lists", summary.contact_lists);
    info!("  - {} profiles", summary.profiles);
    info!("  - {} unique users", summary.unique_users);
    if let Some(path) = output {
        info!("  written to {}", path.display());
    }

    Ok(())
}
