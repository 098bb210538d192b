//! # Event Publisher
//!
//! The ledger-runtime side of the bus.

use crate::events::{ChainEvent, EventKind};
use crate::subscriber::{ChainEventHandler, HandlerError, HandlerMap, Subscription};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, error};

/// Failure of at least one handler while dispatching an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} handler {subscription} failed: {source}")]
pub struct PublishError {
    /// Kind of event being dispatched.
    pub kind: EventKind,
    /// Subscription whose handler failed.
    pub subscription: u64,
    /// What the handler reported.
    pub source: HandlerError,
}

/// Where observers register for chain events.
pub trait ChainEvents: Send + Sync {
    /// Connect `handler` until the returned [`Subscription`] is dropped.
    fn subscribe(&self, handler: Arc<dyn ChainEventHandler>) -> Subscription;
}

/// In-process, synchronous implementation of the bus.
///
/// `publish` calls every live handler in subscription order before returning.
/// Handlers are snapshotted first, so a handler may drop its own subscription
/// while being called.
pub struct InMemoryChainBus {
    /// Live handlers by subscription id.
    handlers: Arc<HandlerMap>,

    /// Next subscription id.
    next_id: AtomicU64,

    /// Total events published.
    events_published: AtomicU64,
}

impl InMemoryChainBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
        }
    }

    /// Dispatch `event` to every live handler.
    ///
    /// # Returns
    ///
    /// The number of handlers reached.
    ///
    /// # Errors
    ///
    /// The first handler error on an accepted block. Handlers after the failing
    /// one are not called for that block.
    pub fn publish(&self, event: &ChainEvent) -> Result<usize, PublishError> {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let snapshot: Vec<(u64, Arc<dyn ChainEventHandler>)> = match self.handlers.read() {
            Ok(map) => map.iter().map(|(id, h)| (*id, Arc::clone(h))).collect(),
            Err(_) => return Ok(0),
        };

        if snapshot.is_empty() {
            debug!(kind = %event.kind(), "Event published with no subscribers");
            return Ok(0);
        }

        for (id, handler) in &snapshot {
            match event {
                ChainEvent::AppliedTransaction(trace) => handler.on_applied_transaction(trace),
                ChainEvent::AcceptedBlock(block) => {
                    if let Err(source) = handler.on_accepted_block(block) {
                        error!(
                            subscription = id,
                            block_num = block.block_num,
                            error = %source,
                            "Accepted block handler failed"
                        );
                        return Err(PublishError {
                            kind: event.kind(),
                            subscription: *id,
                            source,
                        });
                    }
                }
            }
        }

        Ok(snapshot.len())
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Total events passed to [`publish`](Self::publish).
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryChainBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainEvents for InMemoryChainBus {
    fn subscribe(&self, handler: Arc<dyn ChainEventHandler>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.handlers.write() {
            map.insert(id, handler);
        }
        debug!(subscription = id, "New subscription created");
        Subscription::new(id, Arc::downgrade(&self.handlers))
    }
}
