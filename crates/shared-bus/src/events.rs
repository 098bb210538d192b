//! # Chain Events
//!
//! The notifications the ledger runtime hands to observers.

use serde::{Deserialize, Serialize};
use shared_types::{AcceptedBlock, TransactionTrace};
use std::fmt;

/// A single notification from the ledger runtime.
///
/// Tagged by `type` on the wire so a feed can mix both kinds:
///
/// ```json
/// {"type": "applied_transaction", "id": "…", "action_traces": [...]}
/// {"type": "accepted_block", "block_num": 7, "timestamp": "…", "transactions": [...]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent {
    /// A transaction was executed; carries its action trace.
    AppliedTransaction(TransactionTrace),
    /// A block was accepted; carries its transaction receipts.
    AcceptedBlock(AcceptedBlock),
}

/// Discriminant of a [`ChainEvent`], for logs and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AppliedTransaction,
    AcceptedBlock,
}

impl ChainEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AppliedTransaction(_) => EventKind::AppliedTransaction,
            Self::AcceptedBlock(_) => EventKind::AcceptedBlock,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppliedTransaction => f.write_str("applied_transaction"),
            Self::AcceptedBlock => f.write_str("accepted_block"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Checksum256;

    #[test]
    fn test_tagged_json() {
        let json = serde_json::json!({
            "type": "applied_transaction",
            "id": Checksum256::hash(b"t").to_string(),
            "action_traces": []
        });
        let event: ChainEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind(), EventKind::AppliedTransaction);

        let json = serde_json::json!({
            "type": "accepted_block",
            "block_num": 3,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        let event: ChainEvent = serde_json::from_value(json).unwrap();
        match event {
            ChainEvent::AcceptedBlock(block) => assert_eq!(block.block_num, 3),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let json = serde_json::json!({ "type": "irreversible_block", "block_num": 1 });
        assert!(serde_json::from_value::<ChainEvent>(json).is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(EventKind::AcceptedBlock.to_string(), "accepted_block");
    }
}
