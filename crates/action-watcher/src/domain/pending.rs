//! # Pending Action Index
//!
//! Staged actions per transaction id, waiting for the block that includes the
//! transaction. Each id is staged at most once.

use chrono::{DateTime, Utc};
use shared_types::TransactionId;
use std::collections::HashMap;

use super::entities::SequencedAction;

/// Actions staged for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// When the transaction was staged; drives expiry.
    pub staged_at: DateTime<Utc>,
    /// Matched actions in traversal order.
    pub actions: Vec<SequencedAction>,
}

#[derive(Debug, Clone, Default)]
pub struct PendingActionIndex {
    entries: HashMap<TransactionId, PendingEntry>,
}

impl PendingActionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `actions` under `tx_id`.
    ///
    /// Returns false (and changes nothing) if the id is already staged or
    /// there is nothing to stage.
    pub fn stage(
        &mut self,
        tx_id: TransactionId,
        staged_at: DateTime<Utc>,
        actions: Vec<SequencedAction>,
    ) -> bool {
        if actions.is_empty() || self.entries.contains_key(&tx_id) {
            return false;
        }
        self.entries.insert(tx_id, PendingEntry { staged_at, actions });
        true
    }

    pub fn contains(&self, tx_id: &TransactionId) -> bool {
        self.entries.contains_key(tx_id)
    }

    pub fn get(&self, tx_id: &TransactionId) -> Option<&PendingEntry> {
        self.entries.get(tx_id)
    }

    /// Remove and return every action staged for `tx_id`.
    pub fn take(&mut self, tx_id: &TransactionId) -> Option<PendingEntry> {
        self.entries.remove(tx_id)
    }

    /// Drop entries staged strictly before `cutoff`. Returns how many went.
    pub fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.staged_at >= cutoff);
        before - self.entries.len()
    }

    /// Number of staged transactions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of staged actions across all transactions.
    pub fn action_count(&self) -> usize {
        self.entries.values().map(|e| e.actions.len()).sum()
    }
}
