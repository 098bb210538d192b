//! Ports layer for the action watcher.
//!
//! - Inbound (driving): what the host calls
//! - Outbound (driven): ABI decoding, time, notification delivery, HTTP

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
