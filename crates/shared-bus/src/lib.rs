//! # Shared Bus - Ledger Runtime Event Hookup
//!
//! Connects observers to the two notifications the ledger runtime emits:
//! an applied transaction (with its full action trace) and an accepted block.
//!
//! ## Dispatch Model
//!
//! ```text
//! ┌────────────────┐   publish(&ChainEvent)   ┌─────────────────┐
//! │ Ledger runtime │ ───────────────────────▶ │ InMemoryChainBus │
//! └────────────────┘                          └────────┬────────┘
//!                                                      │ in subscription order
//!                                                      ▼
//!                                           ┌────────────────────┐
//!                                           │ ChainEventHandler  │ (one per live
//!                                           └────────────────────┘  Subscription)
//! ```
//!
//! Handlers are invoked synchronously on the publishing thread, one event at a
//! time. A [`Subscription`] is an owned capability: dropping it removes the
//! handler. Nothing is registered globally.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{ChainEvent, EventKind};
pub use publisher::{ChainEvents, InMemoryChainBus, PublishError};
pub use subscriber::{ChainEventHandler, HandlerError, Subscription};
