//! # Domain Layer - Action Watcher
//!
//! Pure correlation logic; no I/O happens here.
//!
//! ## Components
//!
//! - `filter`: `FilterTable` of (receiver, action-or-any) entries
//! - `pending`: `PendingActionIndex` of staged actions per transaction id
//! - `correlator`: `ActionCorrelator`, the per-transaction state machine
//! - `payload`: `PayloadBuilder`, decode and assemble `ActionNotif`s
//! - `config`: `WatcherOptions` and the validated `WatcherConfig`
//! - `entities`: wire payload and delivery task types
//! - `value_objects`: constants and `BlockReport`
//! - `errors`: error enumerations

pub mod config;
pub mod correlator;
pub mod entities;
pub mod errors;
pub mod filter;
pub mod payload;
pub mod pending;
pub mod value_objects;

pub use config::*;
pub use correlator::*;
pub use entities::*;
pub use errors::*;
pub use filter::*;
pub use payload::*;
pub use pending::*;
pub use value_objects::*;
