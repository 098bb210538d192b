//! # Shared Types Crate
//!
//! Chain-level types shared by every crate in the watcher workspace.
//!
//! ## Contents
//!
//! - **Names**: [`Name`], the 64-bit packed account/action identifier.
//! - **Chain entities**: actions, action traces, transaction traces, packed
//!   transactions, receipts and accepted blocks.
//! - **ABI**: the [`abi::Abi`] definition model and [`abi::AbiSerializer`], which
//!   turns an action's opaque bytes into a JSON value.
//!
//! ## Design Principles
//!
//! - **Read-only inputs**: everything the ledger runtime hands over is plain data;
//!   consumers clone what they keep.
//! - **Wire-stable serde**: names serialize as strings, ids and byte blobs as hex.

pub mod abi;
pub mod entities;
pub mod errors;
pub mod name;

pub use abi::{Abi, AbiError, AbiSerializer};
pub use entities::*;
pub use errors::*;
pub use name::{Name, NameError};
