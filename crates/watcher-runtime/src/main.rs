//! # watcher-node
//!
//! Replays a chain event feed through the action watcher and POSTs the
//! resulting notifications.
//!
//! ```text
//! watcher-node --watch alice:transfer --watch-receiver-url http://localhost:8080/actions \
//!              --abi-dir ./abis --events blocks.ndjson
//! ```

use std::sync::Arc;

use action_watcher::WatcherConfig;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use watcher_runtime::{load_abis, Cli, EventFeed, WatcherNode};
use watcher_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig::from_env();
    let _metrics = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = match WatcherConfig::from_options(cli.watcher_options()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid watcher configuration");
            return Err(e).context("invalid watcher configuration");
        }
    };

    let abis = load_abis(cli.abi_dir.as_deref()).context("failed to load ABIs")?;
    let mut node = WatcherNode::new(config, Arc::new(abis)).context("failed to initialize watcher")?;
    node.start().context("failed to start watcher")?;

    let mut feed = EventFeed::open(&cli.events)
        .await
        .context("failed to open event feed")?;

    info!(service = %telemetry.service_name, events = %cli.events, "Watcher node is running. Press Ctrl+C to stop.");

    let outcome = tokio::select! {
        result = node.replay(&mut feed) => Some(result),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutdown signal received");
            None
        }
    };

    node.shutdown().await;

    let stats = node.delivery_stats();
    info!(
        delivered = stats.delivered,
        dropped = stats.dropped,
        pending = node.pending_transactions(),
        "Watcher node stopped"
    );

    if let Some(result) = outcome {
        let summary = result.context("event replay failed")?;
        info!(
            transactions = summary.transactions,
            blocks = summary.blocks,
            "Event feed exhausted"
        );
    }
    Ok(())
}
