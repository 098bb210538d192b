//! # Error Types
//!
//! Errors raised while interpreting chain data handed over by the ledger runtime.

use thiserror::Error;

/// Errors produced by chain entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The compressed transaction bytes do not inflate.
    #[error("cannot derive id: {compression} transaction does not inflate: {reason}")]
    InvalidCompressedTransaction { compression: String, reason: String },

    /// The packed transaction carries no transaction bytes at all.
    #[error("cannot derive id: packed transaction is empty")]
    EmptyPackedTransaction,

    /// A checksum string is not 32 bytes of hex.
    #[error("invalid checksum {value:?}: {reason}")]
    InvalidChecksum { value: String, reason: String },
}
