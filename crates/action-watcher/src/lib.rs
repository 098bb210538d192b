//! # Action Watcher
//!
//! Watches applied transactions and accepted blocks, selects actions by
//! `(receiver, action)` filter, and pushes one JSON notification per block to
//! an HTTP receiver for the matching actions that block finalized.
//!
//! ## Flow
//!
//! ```text
//! applied transaction ──→ ActionCorrelator ──stage──→ PendingActionIndex
//! accepted block ───────→ ActionCorrelator ──take───→ PayloadBuilder ──→ Message
//!                                                          │ AbiDecoder
//!                                                          ▼
//!                                          HttpAsyncClient (1 worker, FIFO, 1 retry)
//!                                                          │
//!                                                          ▼
//!                                                   HTTP receiver
//! ```
//!
//! ## Guarantees
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | A transaction id is staged at most once | `PendingActionIndex::stage` |
//! | Sequence numbers count every visited action, depth-first | `ActionCorrelator::on_applied_transaction` |
//! | One undecodable action never sinks its batch | `PayloadBuilder::build` |
//! | Blocks past the age limit send nothing but still resolve | `ActionCorrelator::on_accepted_block` |
//! | Unresolved entries expire after `pending_expiry` | `PendingActionIndex::evict_older_than` |
//! | At most two send attempts per message, FIFO | `adapters::http_client` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - HttpAsyncClient, ReqwestTransport, AbiRegistry     │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - ActionWatcherApi                           │
//! │  ports/outbound.rs - AbiDecoder, TimeSource, NotificationSink,  │
//! │                      HttpTransport                              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - FilterTable, PendingActionIndex, ActionCorrelator,   │
//! │            PayloadBuilder, WatcherConfig, errors                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod plugin;
pub mod ports;
pub mod service;

pub use adapters::{AbiLoadError, AbiRegistry, DeliveryStats, HttpAsyncClient, ReqwestTransport};
pub use domain::*;
pub use plugin::{PluginState, WatcherPlugin};
pub use ports::*;
pub use service::WatcherService;
