//! # Inbound Port - ActionWatcherApi
//!
//! Driving port through which the ledger runtime feeds the watcher.

use shared_types::{AcceptedBlock, TransactionTrace};

use crate::domain::{BlockReport, WatcherError};

/// Primary API of the action watcher.
///
/// Calls are expected sequentially from a single ingestion context.
pub trait ActionWatcherApi: Send + Sync {
    /// Stage the matching actions of an applied transaction.
    ///
    /// Returns how many actions were staged; 0 for a transaction already
    /// staged or with no matches.
    fn stage_transaction(&self, trace: &TransactionTrace) -> usize;

    /// Resolve the staged transactions included in `block` and enqueue their
    /// notifications.
    ///
    /// # Errors
    /// - `Chain`: a transaction id in the block could not be derived. The
    ///   index is left untouched.
    fn resolve_block(&self, block: &AcceptedBlock) -> Result<BlockReport, WatcherError>;

    /// Transactions currently staged.
    fn pending_transactions(&self) -> usize;
}
