//! Prometheus metrics for the action watcher.
//!
//! All metrics follow the naming convention: `watcher_<area>_<metric>[_total]`

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CORRELATION
    // =========================================================================

    /// Matching actions staged from applied transactions
    pub static ref ACTIONS_STAGED: IntCounter = IntCounter::new(
        "watcher_correlator_actions_staged_total",
        "Matching actions staged from applied transactions"
    ).expect("metric creation failed");

    /// Staged transactions found in an accepted block
    pub static ref TRANSACTIONS_RESOLVED: IntCounter = IntCounter::new(
        "watcher_correlator_transactions_resolved_total",
        "Staged transactions resolved by an accepted block"
    ).expect("metric creation failed");

    /// Blocks whose notifications were suppressed by the age limit
    pub static ref BLOCKS_SKIPPED_BY_AGE: IntCounter = IntCounter::new(
        "watcher_correlator_blocks_skipped_total",
        "Accepted blocks older than the age limit"
    ).expect("metric creation failed");

    /// Staged transactions dropped by the expiry window
    pub static ref PENDING_EVICTED: IntCounter = IntCounter::new(
        "watcher_correlator_pending_evicted_total",
        "Staged transactions evicted without being included in a block"
    ).expect("metric creation failed");

    /// Transactions currently staged
    pub static ref PENDING_TRANSACTIONS: IntGauge = IntGauge::new(
        "watcher_correlator_pending_transactions",
        "Transactions with staged actions awaiting block inclusion"
    ).expect("metric creation failed");

    // =========================================================================
    // PAYLOAD
    // =========================================================================

    /// Actions dropped because their data could not be decoded
    pub static ref DECODE_FAILURES: IntCounter = IntCounter::new(
        "watcher_payload_decode_failures_total",
        "Staged actions dropped on ABI decode failure"
    ).expect("metric creation failed");

    // =========================================================================
    // DELIVERY
    // =========================================================================

    /// Messages handed to the delivery client
    pub static ref NOTIFICATIONS_ENQUEUED: IntCounter = IntCounter::new(
        "watcher_delivery_enqueued_total",
        "Messages queued for delivery"
    ).expect("metric creation failed");

    /// HTTP send attempts (first tries and retries)
    pub static ref DELIVERY_ATTEMPTS: IntCounter = IntCounter::new(
        "watcher_delivery_attempts_total",
        "HTTP POST attempts"
    ).expect("metric creation failed");

    /// Messages accepted by the receiver
    pub static ref DELIVERIES_SUCCEEDED: IntCounter = IntCounter::new(
        "watcher_delivery_succeeded_total",
        "Messages delivered to the receiver"
    ).expect("metric creation failed");

    /// Messages dropped after the final attempt failed
    pub static ref DELIVERIES_DROPPED: IntCounter = IntCounter::new(
        "watcher_delivery_dropped_total",
        "Messages dropped after exhausting retries"
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// The registry holding every watcher metric.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Correlation
        Box::new(ACTIONS_STAGED.clone()),
        Box::new(TRANSACTIONS_RESOLVED.clone()),
        Box::new(BLOCKS_SKIPPED_BY_AGE.clone()),
        Box::new(PENDING_EVICTED.clone()),
        Box::new(PENDING_TRANSACTIONS.clone()),
        // Payload
        Box::new(DECODE_FAILURES.clone()),
        // Delivery
        Box::new(NOTIFICATIONS_ENQUEUED.clone()),
        Box::new(DELIVERY_ATTEMPTS.clone()),
        Box::new(DELIVERIES_SUCCEEDED.clone()),
        Box::new(DELIVERIES_DROPPED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
