//! Relay configuration with validation.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Currency};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

/// Default listening port.
pub const DEFAULT_RELAY_PORT: u16 = 3001;

/// Main relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Bind address
    pub host: IpAddr,
    /// Bind port
    pub port: u16,
    /// Accounts whose keys the relay holds
    pub authorized_accounts: Vec<Address>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_RELAY_PORT,
            authorized_accounts: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Configuration serving `accounts` on the default address.
    #[must_use]
    pub fn with_accounts(accounts: impl IntoIterator<Item = Address>) -> Self {
        Self {
            authorized_accounts: accounts.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authorized_accounts.is_empty() {
            return Err(ConfigError::NoAuthorizedAccounts);
        }
        if let Some(zero) = self.authorized_accounts.iter().find(|a| a.is_zero()) {
            return Err(ConfigError::InvalidAccount(zero.to_string()));
        }
        Ok(())
    }

    /// Socket address to bind.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The configured accounts as a lookup set.
    #[must_use]
    pub fn key_set(&self) -> KeySet {
        KeySet {
            accounts: self.authorized_accounts.iter().copied().collect(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The relay would refuse every request.
    #[error("no authorized accounts configured")]
    NoAuthorizedAccounts,
    /// An account that can never sign.
    #[error("invalid authorized account: {0}")]
    InvalidAccount(String),
}

/// Accounts the relay may withdraw for.
///
/// Lookups parse the raw path segment, so any hex casing and an optional
/// `0x` prefix resolve to the same account.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    accounts: HashSet<Address>,
}

impl KeySet {
    /// Resolve a raw account string to an authorized address.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<Address> {
        raw.parse::<Address>()
            .ok()
            .filter(|account| self.accounts.contains(account))
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no account is authorized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Parse the `currency` query value. Only the external tickers are accepted.
#[must_use]
pub fn parse_currency(raw: &str) -> Option<Currency> {
    match raw.to_ascii_lowercase().as_str() {
        "eth" => Some(Currency::Native),
        "usdc" => Some(Currency::Stable),
        _ => None,
    }
}
