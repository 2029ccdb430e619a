//! # Registrar Telemetry
//!
//! Logging and metrics shared by the registrar binaries.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber with env filter, plain or JSON output
//! - **Metrics**: Prometheus registry scraped from the relay's `/metrics`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use registrar_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DR_SERVICE_NAME` | `domain-registrar` | Service name in logs |
//! | `DR_LOG_LEVEL` | `info` | Log filter (`RUST_LOG` also honored) |
//! | `DR_JSON_LOGS` | `false` (`true` in containers) | JSON log output |
//! | `DR_METRICS_PORT` | `9100` | Prometheus port |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;
mod metrics;

pub use config::{TelemetryConfig, DEFAULT_METRICS_PORT};
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, metrics_content_type, register_metrics, DOMAINS, LAST_EVENT_SEQUENCE,
    PRICE_CHANGES, REGISTRATIONS, REGISTRY, WITHDRAW_DURATION, WITHDRAW_REQUESTS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A collector could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// A configuration value is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install logging.
///
/// # Errors
///
/// Whatever [`register_metrics`] or [`init_logging`] report.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
