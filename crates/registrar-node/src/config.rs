//! # Node Configuration
//!
//! Everything the node needs to host the registry and the relay, read from
//! `DR_*` environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DR_ADMIN` | required | Administrator address |
//! | `DR_DOMAIN_PRICE` | `0` | Initial global price, stablecoin smallest units |
//! | `DR_CONVERSION_RATE` | parity | Native smallest units per whole stablecoin |
//! | `DR_RATE_REFRESH_POLICY` | `anyone` | `anyone` or `administrator_only` |
//! | `DR_EVENT_BUS_CAPACITY` | `1000` | Live event channel capacity |
//! | `DR_RELAY_HOST` / `DR_RELAY_PORT` | `127.0.0.1` / `3001` | Relay bind address |
//! | `DR_RELAY_ACCOUNTS` | empty | Comma-separated accounts the relay serves |
//! | `DR_SNAPSHOT_PATH` | unset | Snapshot loaded at start and written at shutdown |
//! | `DR_MIGRATION_RATE` | parity | Rate applied when the snapshot is first-version |

use dr_01_registry::prelude::{ConversionRate, RateRefreshPolicy, RegistryConfig};
use dr_02_withdraw_relay::prelude::{ConfigError as RelayConfigError, RelayConfig};
use shared_types::{Address, StableAmount, U256};
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Registry core configuration.
    pub registry: RegistryConfig,
    /// Relay configuration.
    pub relay: RelayConfig,
    /// Where state is persisted across restarts.
    pub snapshot_path: Option<PathBuf>,
    /// Rate used to migrate a first-version snapshot.
    pub migration_rate: ConversionRate,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable holds something unparsable.
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// Registry settings rejected.
    #[error("registry: {0}")]
    Registry(String),

    /// Relay settings rejected.
    #[error("relay: {0}")]
    Relay(#[from] RelayConfigError),
}

impl NodeConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// `Missing` or `Invalid` for the offending variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// As [`NodeConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let administrator: Address =
            parse(&lookup, "DR_ADMIN")?.ok_or(ConfigError::Missing("DR_ADMIN"))?;

        let mut registry = RegistryConfig::new(
            administrator,
            parse_u256(&lookup, "DR_DOMAIN_PRICE")?.map_or(StableAmount::ZERO, StableAmount::new),
        );
        if let Some(rate) = parse_u256(&lookup, "DR_CONVERSION_RATE")? {
            registry.initial_rate = ConversionRate::new(rate);
        }
        if let Some(raw) = lookup("DR_RATE_REFRESH_POLICY") {
            registry.rate_refresh_policy =
                parse_policy(&raw).ok_or_else(|| ConfigError::Invalid {
                    var: "DR_RATE_REFRESH_POLICY",
                    value: raw.clone(),
                    reason: "expected anyone or administrator_only".into(),
                })?;
        }
        if let Some(capacity) = parse::<usize>(&lookup, "DR_EVENT_BUS_CAPACITY")? {
            registry.event_bus_capacity = capacity;
        }

        let mut relay = RelayConfig::default();
        if let Some(host) = parse::<IpAddr>(&lookup, "DR_RELAY_HOST")? {
            relay.host = host;
        }
        if let Some(port) = parse::<u16>(&lookup, "DR_RELAY_PORT")? {
            relay.port = port;
        }
        if let Some(raw) = lookup("DR_RELAY_ACCOUNTS") {
            relay.authorized_accounts = raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| {
                    entry.parse::<Address>().map_err(|e| ConfigError::Invalid {
                        var: "DR_RELAY_ACCOUNTS",
                        value: entry.to_string(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(Self {
            registry,
            relay,
            snapshot_path: lookup("DR_SNAPSHOT_PATH").map(PathBuf::from),
            migration_rate: parse_u256(&lookup, "DR_MIGRATION_RATE")?
                .map_or_else(ConversionRate::parity, ConversionRate::new),
        })
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// `Registry` or `Relay` with the section's own complaint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry
            .validate()
            .map_err(|e| ConfigError::Registry(e.to_string()))?;
        if !self.migration_rate.is_usable() {
            return Err(ConfigError::Registry(
                "migration rate must be non-zero".into(),
            ));
        }
        self.relay.validate()?;
        Ok(())
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_u256(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<U256>, ConfigError> {
    lookup(var)
        .map(|value| {
            U256::from_dec_str(value.trim()).map_err(|e| ConfigError::Invalid {
                var,
                reason: format!("{e:?}"),
                value,
            })
        })
        .transpose()
}

fn parse_policy(raw: &str) -> Option<RateRefreshPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "anyone" => Some(RateRefreshPolicy::Anyone),
        "administrator_only" | "admin" => Some(RateRefreshPolicy::AdministratorOnly),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn admin_hex() -> String {
        format!("0x{}", "ad".repeat(20))
    }

    #[test]
    fn test_admin_is_required() {
        assert!(matches!(
            NodeConfig::from_lookup(lookup_from(&[])),
            Err(ConfigError::Missing("DR_ADMIN"))
        ));
    }

    #[test]
    fn test_defaults() {
        let admin = admin_hex();
        let config = NodeConfig::from_lookup(lookup_from(&[("DR_ADMIN", &admin)])).unwrap();

        assert_eq!(config.registry.administrator, Address::repeat_byte(0xAD));
        assert_eq!(config.registry.initial_domain_price, StableAmount::ZERO);
        assert_eq!(config.registry.initial_rate, ConversionRate::parity());
        assert_eq!(config.registry.rate_refresh_policy, RateRefreshPolicy::Anyone);
        assert_eq!(config.relay.port, 3001);
        assert!(config.snapshot_path.is_none());
        // No relay accounts yet.
        assert!(matches!(config.validate(), Err(ConfigError::Relay(_))));
    }

    #[test]
    fn test_full_environment() {
        let admin = admin_hex();
        let accounts = format!("{}, 0x{}", admin, "BB".repeat(20));
        let config = NodeConfig::from_lookup(lookup_from(&[
            ("DR_ADMIN", &admin),
            ("DR_DOMAIN_PRICE", "5000000"),
            ("DR_CONVERSION_RATE", "400000000000000"),
            ("DR_RATE_REFRESH_POLICY", "Administrator_Only"),
            ("DR_EVENT_BUS_CAPACITY", "64"),
            ("DR_RELAY_PORT", "8080"),
            ("DR_RELAY_ACCOUNTS", &accounts),
            ("DR_SNAPSHOT_PATH", "/tmp/registry.json"),
        ]))
        .unwrap();

        assert_eq!(
            config.registry.initial_domain_price,
            StableAmount::from(5_000_000u64)
        );
        assert_eq!(
            config.registry.rate_refresh_policy,
            RateRefreshPolicy::AdministratorOnly
        );
        assert_eq!(config.registry.event_bus_capacity, 64);
        assert_eq!(config.relay.port, 8080);
        assert_eq!(
            config.relay.authorized_accounts,
            vec![Address::repeat_byte(0xAD), Address::repeat_byte(0xBB)]
        );
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/registry.json")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let admin = admin_hex();
        let err = NodeConfig::from_lookup(lookup_from(&[
            ("DR_ADMIN", &admin),
            ("DR_RELAY_PORT", "http"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DR_RELAY_PORT", .. }));

        let err = NodeConfig::from_lookup(lookup_from(&[
            ("DR_ADMIN", &admin),
            ("DR_DOMAIN_PRICE", "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DR_DOMAIN_PRICE", .. }));
    }

    #[test]
    fn test_zero_rate_fails_validation() {
        let admin = admin_hex();
        let config = NodeConfig::from_lookup(lookup_from(&[
            ("DR_ADMIN", &admin),
            ("DR_CONVERSION_RATE", "0"),
            ("DR_RELAY_ACCOUNTS", &admin),
        ]))
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Registry(_))));
    }
}
