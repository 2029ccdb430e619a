//! Prometheus metrics for the registrar.
//!
//! All metrics follow the naming convention: `dr_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REGISTRY METRICS
    // =========================================================================

    /// Committed registrations
    pub static ref REGISTRATIONS: Counter = Counter::new(
        "dr_registry_registrations_total",
        "Domains registered"
    ).expect("metric creation failed");

    /// Price changes (global and per-domain)
    pub static ref PRICE_CHANGES: Counter = Counter::new(
        "dr_registry_price_changes_total",
        "Committed price changes"
    ).expect("metric creation failed");

    /// Registered domains
    pub static ref DOMAINS: Gauge = Gauge::new(
        "dr_registry_domains",
        "Number of registered domains"
    ).expect("metric creation failed");

    /// Highest committed event sequence seen by the node
    pub static ref LAST_EVENT_SEQUENCE: Gauge = Gauge::new(
        "dr_registry_last_event_sequence",
        "Sequence number of the last committed event"
    ).expect("metric creation failed");

    // =========================================================================
    // RELAY METRICS
    // =========================================================================

    /// Withdraw requests by currency and outcome
    pub static ref WITHDRAW_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("dr_relay_withdraw_requests_total", "Withdraw requests received by the relay"),
        &["currency", "outcome"]  // outcome: ok/rejected/failed
    ).expect("metric creation failed");

    /// Withdraw handling duration
    pub static ref WITHDRAW_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "dr_relay_withdraw_duration_seconds",
            "Time spent serving a withdraw request"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Register every registrar metric with [`REGISTRY`].
///
/// Calling this more than once is harmless.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` when a collector is rejected for any reason
/// other than being registered already.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Registry
        Box::new(REGISTRATIONS.clone()),
        Box::new(PRICE_CHANGES.clone()),
        Box::new(DOMAINS.clone()),
        Box::new(LAST_EVENT_SEQUENCE.clone()),
        // Relay
        Box::new(WITHDRAW_REQUESTS.clone()),
        Box::new(WITHDRAW_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if encoding fails.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Content type for [`encode_metrics`] output.
#[must_use]
pub fn metrics_content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
