//! # Domain Entities
//!
//! Registered domains and the registry configuration.

use crate::domain::value_objects::{ConversionRate, DomainName};
use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use shared_types::{Address, StableAmount};

/// A registered domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Full dotted name.
    pub name: DomainName,
    /// Owner recorded at registration. Never changes.
    pub owner: Address,
    /// Price, in stablecoin units, for registering a direct child.
    pub child_price: StableAmount,
}

/// Who may refresh the conversion rate from the oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateRefreshPolicy {
    /// Any caller.
    #[default]
    Anyone,
    /// Only the registry administrator.
    AdministratorOnly,
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The single privileged account.
    pub administrator: Address,
    /// Global default price for top-level names and new domains' child price.
    pub initial_domain_price: StableAmount,
    /// Rate in effect until the first oracle refresh.
    pub initial_rate: ConversionRate,
    /// Who may trigger an oracle refresh.
    pub rate_refresh_policy: RateRefreshPolicy,
    /// Live event channel capacity.
    pub event_bus_capacity: usize,
}

impl RegistryConfig {
    /// Configuration with defaults for everything except the administrator
    /// and the initial price.
    #[must_use]
    pub fn new(administrator: Address, initial_domain_price: StableAmount) -> Self {
        Self {
            administrator,
            initial_domain_price,
            ..Self::default()
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on a zero administrator, an unusable rate, or a zero
    /// channel capacity.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.administrator.is_zero() {
            return Err(RegistryError::InvalidConfig(
                "administrator must not be the zero address".into(),
            ));
        }
        if !self.initial_rate.is_usable() {
            return Err(RegistryError::InvalidConfig(
                "initial conversion rate must be non-zero".into(),
            ));
        }
        if self.event_bus_capacity == 0 {
            return Err(RegistryError::InvalidConfig(
                "event bus capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            administrator: Address::ZERO,
            initial_domain_price: StableAmount::ZERO,
            initial_rate: ConversionRate::parity(),
            rate_refresh_policy: RateRefreshPolicy::Anyone,
            event_bus_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::U256;

    #[test]
    fn test_config_validation() {
        let admin = Address::repeat_byte(0xAD);
        assert!(RegistryConfig::new(admin, StableAmount::from(6u64))
            .validate()
            .is_ok());

        assert!(RegistryConfig::default().validate().is_err());

        let mut zero_rate = RegistryConfig::new(admin, StableAmount::ZERO);
        zero_rate.initial_rate = ConversionRate::new(U256::zero());
        assert!(matches!(
            zero_rate.validate(),
            Err(RegistryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_refresh_policy_default_is_open() {
        assert_eq!(RateRefreshPolicy::default(), RateRefreshPolicy::Anyone);
    }
}
