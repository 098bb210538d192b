//! # Watcher Node
//!
//! Wires the plugin to an in-memory chain bus and replays a feed into it.
//!
//! ```text
//! EventFeed ──ChainEvent──→ InMemoryChainBus ──→ WatcherService
//!                                                    │
//!                                                    ↓
//!                                             HttpAsyncClient ──POST──→ receiver
//! ```

use action_watcher::{
    AbiLoadError, AbiRegistry, ActionWatcherApi, DeliveryStats, HttpTransport, PluginState, SystemTimeSource,
    WatcherConfig, WatcherError, WatcherPlugin,
};
use shared_bus::{ChainEvent, InMemoryChainBus, PublishError};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tracing::{debug, error};

use crate::feed::{EventFeed, FeedError};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// Counts from one feed replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub transactions: u64,
    pub blocks: u64,
}

impl ReplaySummary {
    pub fn events(&self) -> u64 {
        self.transactions + self.blocks
    }
}

/// Registry populated from `dir`, or empty when no directory is configured.
pub fn load_abis(dir: Option<&Path>) -> Result<AbiRegistry, AbiLoadError> {
    let registry = AbiRegistry::new();
    if let Some(dir) = dir {
        registry.load_dir(dir)?;
    }
    Ok(registry)
}

pub struct WatcherNode {
    bus: InMemoryChainBus,
    plugin: WatcherPlugin,
}

impl WatcherNode {
    /// Node delivering over HTTP with the system clock.
    pub fn new(config: WatcherConfig, abis: Arc<AbiRegistry>) -> Result<Self, WatcherError> {
        let bus = InMemoryChainBus::new();
        let plugin = WatcherPlugin::initialize(config, &bus, abis)?;
        Ok(Self { bus, plugin })
    }

    /// Node delivering through `transport`.
    pub fn with_transport(
        config: WatcherConfig,
        abis: Arc<AbiRegistry>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let bus = InMemoryChainBus::new();
        let plugin = WatcherPlugin::initialize_with(
            config,
            &bus,
            abis,
            transport,
            Arc::new(SystemTimeSource),
        );
        Self { bus, plugin }
    }

    pub fn start(&mut self) -> Result<(), WatcherError> {
        self.plugin.startup()
    }

    /// Publish one event to the watcher.
    pub fn publish(&self, event: &ChainEvent) -> Result<usize, PublishError> {
        self.bus.publish(event)
    }

    /// Publish every event of `feed` until it ends.
    ///
    /// Stops at the first unreadable line or failed block.
    pub async fn replay<R: AsyncBufRead + Unpin>(
        &self,
        feed: &mut EventFeed<R>,
    ) -> Result<ReplaySummary, RuntimeError> {
        let mut summary = ReplaySummary::default();
        while let Some(event) = feed.next_event().await? {
            match &event {
                ChainEvent::AppliedTransaction(trace) => {
                    debug!(tx_id = %trace.id, "Replaying applied transaction");
                    summary.transactions += 1;
                }
                ChainEvent::AcceptedBlock(block) => {
                    debug!(block_num = block.block_num, "Replaying accepted block");
                    summary.blocks += 1;
                }
            }
            if let Err(e) = self.publish(&event) {
                error!(line = feed.lines_read(), error = %e, "Chain event handling failed");
                return Err(e.into());
            }
        }
        Ok(summary)
    }

    /// Disconnect the watcher and drain pending deliveries.
    pub async fn shutdown(&mut self) {
        self.plugin.shutdown().await;
    }

    pub fn state(&self) -> PluginState {
        self.plugin.state()
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        self.plugin.delivery_stats()
    }

    pub fn pending_transactions(&self) -> usize {
        self.plugin.service().pending_transactions()
    }
}
