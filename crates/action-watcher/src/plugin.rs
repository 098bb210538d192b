//! # Watcher Plugin
//!
//! Lifecycle wrapper tying the watcher to a chain event source.
//!
//! | Stage | Method | Effect |
//! |-------|--------|--------|
//! | Initialize | `initialize()` | Build service and delivery client, subscribe to chain events |
//! | Startup | `startup()` | Spawn the delivery worker |
//! | Shutdown | `shutdown()` | Drop the subscription, drain and join the delivery worker |
//!
//! Events arriving between initialize and startup are correlated normally;
//! their notifications wait in the delivery queue until the worker starts.

use shared_bus::{ChainEvents, Subscription};
use std::sync::Arc;
use tracing::info;

use crate::adapters::{DeliveryStats, HttpAsyncClient, ReqwestTransport};
use crate::domain::{ActionCorrelator, WatcherConfig, WatcherError};
use crate::ports::{AbiDecoder, ActionWatcherApi, HttpTransport, SystemTimeSource, TimeSource};
use crate::service::WatcherService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Initialized,
    Running,
    Stopped,
}

pub struct WatcherPlugin {
    service: Arc<WatcherService>,
    client: Arc<HttpAsyncClient>,
    subscription: Option<Subscription>,
    state: PluginState,
}

impl WatcherPlugin {
    /// Initialize with the reqwest transport and the system clock.
    pub fn initialize(
        config: WatcherConfig,
        chain: &dyn ChainEvents,
        decoder: Arc<dyn AbiDecoder>,
    ) -> Result<Self, WatcherError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::initialize_with(
            config,
            chain,
            decoder,
            transport,
            Arc::new(SystemTimeSource),
        ))
    }

    pub fn initialize_with(
        config: WatcherConfig,
        chain: &dyn ChainEvents,
        decoder: Arc<dyn AbiDecoder>,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let client = Arc::new(HttpAsyncClient::with_send_window(
            transport,
            config.send_timeout,
        ));
        let correlator = ActionCorrelator::new(&config, decoder, clock, client.clone());
        let service = Arc::new(WatcherService::new(correlator));
        let subscription = chain.subscribe(service.clone());

        let filters: Vec<String> = config.filters.iter().map(ToString::to_string).collect();
        info!(
            filters = ?filters,
            receiver = %config.receiver_url,
            age_limit = ?config.age_limit,
            pending_expiry = ?config.pending_expiry,
            "Action watcher initialized"
        );

        Self {
            service,
            client,
            subscription: Some(subscription),
            state: PluginState::Initialized,
        }
    }

    /// Start delivering notifications. Needs a tokio runtime.
    pub fn startup(&mut self) -> Result<(), WatcherError> {
        match self.state {
            PluginState::Initialized => {}
            PluginState::Running => return Err(WatcherError::AlreadyRunning),
            PluginState::Stopped => return Err(WatcherError::NotRunning),
        }
        self.client.start()?;
        self.state = PluginState::Running;
        info!("Action watcher started");
        Ok(())
    }

    /// Disconnect from chain events, then drain and stop delivery.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&mut self) {
        if self.state == PluginState::Stopped {
            return;
        }
        drop(self.subscription.take());
        self.client.stop().await;
        self.state = PluginState::Stopped;

        let stats = self.client.stats();
        info!(
            delivered = stats.delivered,
            dropped = stats.dropped,
            pending_transactions = self.service.pending_transactions(),
            pending_actions = self.service.pending_actions(),
            "Action watcher stopped"
        );
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn service(&self) -> &Arc<WatcherService> {
        &self.service
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        self.client.stats()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }
}
