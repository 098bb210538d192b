//! Adapters layer for the action watcher.
//!
//! - `http_client`: single-worker delivery queue with one retry
//! - `reqwest_transport`: `HttpTransport` over reqwest
//! - `abi_registry`: in-memory `AbiDecoder` backed by per-account ABIs

pub mod abi_registry;
pub mod http_client;
pub mod reqwest_transport;

pub use abi_registry::{AbiLoadError, AbiRegistry};
pub use http_client::{DeliveryStats, HttpAsyncClient};
pub use reqwest_transport::ReqwestTransport;
