//! # Action Watcher Service
//!
//! Puts the [`ActionCorrelator`] behind the inbound port and the chain event
//! handler trait.
//!
//! ## Thread Safety
//!
//! The ledger runtime delivers events sequentially, so the mutex is
//! uncontended in practice; it exists so the service can be shared as
//! `Arc<dyn ChainEventHandler>`.

use parking_lot::Mutex;
use shared_bus::{ChainEventHandler, HandlerError};
use shared_types::{AcceptedBlock, TransactionTrace};
use tracing::error;

use crate::domain::{ActionCorrelator, BlockReport, WatcherError};
use crate::ports::ActionWatcherApi;

pub struct WatcherService {
    correlator: Mutex<ActionCorrelator>,
}

impl WatcherService {
    pub fn new(correlator: ActionCorrelator) -> Self {
        Self {
            correlator: Mutex::new(correlator),
        }
    }

    /// Staged actions across all pending transactions.
    pub fn pending_actions(&self) -> usize {
        self.correlator.lock().pending().action_count()
    }
}

impl ActionWatcherApi for WatcherService {
    fn stage_transaction(&self, trace: &TransactionTrace) -> usize {
        self.correlator.lock().on_applied_transaction(trace)
    }

    fn resolve_block(&self, block: &AcceptedBlock) -> Result<BlockReport, WatcherError> {
        self.correlator.lock().on_accepted_block(block)
    }

    fn pending_transactions(&self) -> usize {
        self.correlator.lock().pending_transactions()
    }
}

impl ChainEventHandler for WatcherService {
    fn on_applied_transaction(&self, trace: &TransactionTrace) {
        self.stage_transaction(trace);
    }

    fn on_accepted_block(&self, block: &AcceptedBlock) -> Result<(), HandlerError> {
        self.resolve_block(block).map(|_| ()).map_err(|e| {
            error!(block_num = block.block_num, error = %e, "Cannot process accepted block");
            HandlerError::new(e.to_string())
        })
    }
}
