//! # Event Subscriber
//!
//! The callback side of the bus: handlers and the subscription handle that
//! keeps them connected.

use shared_types::{AcceptedBlock, TransactionTrace};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};
use thiserror::Error;
use tracing::debug;

/// Live handlers keyed by subscription id (ids grow monotonically, so map
/// order is subscription order).
pub(crate) type HandlerMap = RwLock<BTreeMap<u64, Arc<dyn ChainEventHandler>>>;

/// Error a handler reports back to the publisher of an accepted block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Observer of ledger runtime notifications.
///
/// Called on the publishing thread, sequentially and never re-entrantly for
/// a given bus.
pub trait ChainEventHandler: Send + Sync {
    /// A transaction was applied.
    fn on_applied_transaction(&self, trace: &TransactionTrace);

    /// A block was accepted.
    ///
    /// An error here is unrecoverable for the block and is surfaced to the
    /// publisher.
    fn on_accepted_block(&self, block: &AcceptedBlock) -> Result<(), HandlerError>;
}

/// Owned handle keeping one handler connected.
///
/// When dropped, the handler is removed from the bus.
#[must_use = "dropping a Subscription disconnects its handler"]
pub struct Subscription {
    id: u64,
    handlers: Weak<HandlerMap>,
}

impl Subscription {
    pub(crate) fn new(id: u64, handlers: Weak<HandlerMap>) -> Self {
        Self { id, handlers }
    }

    /// Subscription id, unique per bus.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True while both the bus and this handler's registration are alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let Some(handlers) = self.handlers.upgrade() else {
            return false;
        };
        let Ok(map) = handlers.read() else {
            return false;
        };
        map.contains_key(&self.id)
    }

    /// Disconnect now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(handlers) = self.handlers.upgrade() else {
            return;
        };
        let Ok(mut map) = handlers.write() else {
            return;
        };
        if map.remove(&self.id).is_some() {
            debug!(subscription = self.id, "Subscription dropped");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
