//! # Watcher Telemetry
//!
//! Logging and metrics for the action watcher.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` registry with an `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus counters and gauges in a process-wide registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use watcher_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _metrics = init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WATCHER_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `WATCHER_JSON_LOGS` | `false` (`true` in containers) | Emit JSON lines |
//! | `WATCHER_SERVICE_NAME` | `action-watcher` | Name logged at startup |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{encode_metrics, register_metrics, MetricsHandle};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and register metrics.
///
/// Keep the returned handle alive for as long as metrics should be scraped.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<MetricsHandle, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;
    Ok(metrics)
}
