//! Telemetry configuration from environment variables.

use crate::TelemetryError;
use std::env;

/// Default Prometheus scrape port.
pub const DEFAULT_METRICS_PORT: u16 = 9100;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log filter directive (e.g. `info`, `dr_01_registry=debug,info`)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Prometheus metrics port
    pub metrics_port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "domain-registrar".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DR_SERVICE_NAME`: Service name (default: domain-registrar)
    /// - `DR_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `DR_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `DR_METRICS_PORT`: Prometheus metrics port (default: 9100)
    #[must_use]
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("DR_SERVICE_NAME")
                .unwrap_or_else(|_| "domain-registrar".to_string()),

            log_level: env::var("DR_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("DR_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            metrics_port: env::var("DR_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_METRICS_PORT),
        }
    }

    /// Reject settings that cannot produce a working subscriber.
    ///
    /// # Errors
    ///
    /// `TelemetryError::Config` for an empty service name or log filter.
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.service_name.trim().is_empty() {
            return Err(TelemetryError::Config("service name is empty".into()));
        }
        if self.log_level.trim().is_empty() {
            return Err(TelemetryError::Config("log level is empty".into()));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "domain-registrar");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.metrics_port, 9100);
        assert!(!config.json_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag("0"));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let config = TelemetryConfig {
            log_level: "  ".into(),
            ..TelemetryConfig::default()
        };
        assert!(matches!(config.validate(), Err(TelemetryError::Config(_))));
    }
}
