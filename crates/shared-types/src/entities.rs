//! # Core Chain Entities
//!
//! The data the ledger runtime hands to observers.
//!
//! ## Clusters
//!
//! - **Actions**: `PermissionLevel`, `Action`, `ActionTrace`
//! - **Transactions**: `TransactionTrace`, `PackedTransaction`, `TransactionVariant`,
//!   `TransactionReceipt`
//! - **Blocks**: `AcceptedBlock`

use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::errors::ChainError;
use crate::name::Name;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Checksum256(pub [u8; 32]);

/// Transaction identifier (SHA-256 of the serialized transaction).
pub type TransactionId = Checksum256;

/// Block identifier.
pub type BlockId = Checksum256;

impl Checksum256 {
    /// SHA-256 of `data`.
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum256({}..)", hex::encode(&self.0[..8]))
    }
}

impl FromStr for Checksum256 {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ChainError::InvalidChecksum {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ChainError::InvalidChecksum {
                value: s.to_string(),
                reason: format!("expected 32 bytes, got {}", b.len()),
            })?;
        Ok(Self(digest))
    }
}

impl Serialize for Checksum256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checksum256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// An (actor, permission) pair authorizing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

/// A single invocation of account code with an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Account whose code (and ABI) defines the action.
    pub account: Name,
    /// Action name.
    pub name: Name,
    /// Ordered authorizations.
    #[serde(default)]
    pub authorization: Vec<PermissionLevel>,
    /// Binary action payload.
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Record of one executed action and the inline actions it triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTrace {
    /// Account whose code ran for this trace (the notification target).
    pub receiver: Name,
    /// The action as dispatched.
    pub act: Action,
    /// Inline actions in execution order.
    #[serde(default)]
    pub inline_traces: Vec<ActionTrace>,
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Execution trace of an applied transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub id: TransactionId,
    /// Block the transaction was applied in, when known.
    #[serde(default)]
    pub block_num: u32,
    /// Top-level action traces in execution order.
    #[serde(default)]
    pub action_traces: Vec<ActionTrace>,
}

/// Compression applied to `packed_trx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    #[default]
    None,
    Zlib,
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Zlib => f.write_str("zlib"),
        }
    }
}

/// A signed transaction in its packed wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedTransaction {
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub compression: CompressionType,
    #[serde(default, with = "hex_bytes")]
    pub packed_context_free_data: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub packed_trx: Vec<u8>,
}

impl PackedTransaction {
    /// Derive the transaction id: SHA-256 of the serialized transaction.
    ///
    /// # Errors
    ///
    /// Zlib payloads are inflated first; the id covers the inflated bytes.
    ///
    /// # Errors
    ///
    /// - `EmptyPackedTransaction` when there are no transaction bytes
    /// - `InvalidCompressedTransaction` when a compressed payload does not inflate
    pub fn id(&self) -> Result<TransactionId, ChainError> {
        if self.packed_trx.is_empty() {
            return Err(ChainError::EmptyPackedTransaction);
        }
        match self.compression {
            CompressionType::None => Ok(Checksum256::hash(&self.packed_trx)),
            CompressionType::Zlib => {
                let trx = self.inflate()?;
                if trx.is_empty() {
                    return Err(ChainError::EmptyPackedTransaction);
                }
                Ok(Checksum256::hash(&trx))
            }
        }
    }

    fn inflate(&self) -> Result<Vec<u8>, ChainError> {
        let mut trx = Vec::new();
        ZlibDecoder::new(self.packed_trx.as_slice())
            .read_to_end(&mut trx)
            .map_err(|e| ChainError::InvalidCompressedTransaction {
                compression: self.compression.to_string(),
                reason: e.to_string(),
            })?;
        Ok(trx)
    }
}

/// The transaction slot of a block receipt.
///
/// Deferred transactions appear by id only; everything else is packed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionVariant {
    TransactionId(TransactionId),
    PackedTransaction(PackedTransaction),
}

impl TransactionVariant {
    /// The id of the referenced transaction.
    pub fn id(&self) -> Result<TransactionId, ChainError> {
        match self {
            Self::TransactionId(id) => Ok(*id),
            Self::PackedTransaction(packed) => packed.id(),
        }
    }
}

/// Outcome recorded for a transaction in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Executed,
    SoftFail,
    HardFail,
    Delayed,
    Expired,
}

/// A transaction entry in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub cpu_usage_us: u32,
    #[serde(default)]
    pub net_usage_words: u32,
    pub trx: TransactionVariant,
}

// =============================================================================
// BLOCKS
// =============================================================================

/// A block accepted by the ledger runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedBlock {
    pub block_num: u32,
    #[serde(default)]
    pub id: BlockId,
    /// Block production time.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub producer: Name,
    /// Receipts in block order.
    #[serde(default)]
    pub transactions: Vec<TransactionReceipt>,
}

impl AcceptedBlock {
    /// Ids of every transaction in block order.
    ///
    /// Fails on the first receipt whose id cannot be derived.
    pub fn transaction_ids(&self) -> Result<Vec<TransactionId>, ChainError> {
        self.transactions.iter().map(|r| r.trx.id()).collect()
    }
}

/// Serde adapter writing `Vec<u8>` as a hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
