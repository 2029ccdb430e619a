//! # Driven Ports (SPI - Outbound)
//!
//! External collaborators the registry depends on:
//! - the conversion-rate feed
//! - the stablecoin token contract
//! - custody of native coin
//!
//! Adapters implement these traits; the domain layer never calls them.

use crate::domain::value_objects::ConversionRate;
use crate::errors::{OracleError, TokenError, VaultError};
use async_trait::async_trait;
use shared_types::{Address, NativeAmount, StableAmount};

// =============================================================================
// PRICE ORACLE
// =============================================================================

/// Source of the stablecoin-to-native rate.
///
/// A point-in-time read; the registry caches the answer until the next
/// explicit refresh.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Latest rate, native smallest units per one whole stablecoin.
    async fn latest_rate(&self) -> Result<ConversionRate, OracleError>;
}

// =============================================================================
// STABLECOIN TOKEN
// =============================================================================

/// The stablecoin contract, seen from the registry's account.
#[async_trait]
pub trait StablecoinToken: Send + Sync {
    /// Pull `amount` from `owner` into the registry, spending the allowance
    /// `owner` granted the registry.
    async fn transfer_from(&self, owner: Address, amount: StableAmount) -> Result<(), TokenError>;

    /// Send `amount` from the registry to `to`.
    async fn transfer(&self, to: Address, amount: StableAmount) -> Result<(), TokenError>;
}

// =============================================================================
// NATIVE VAULT
// =============================================================================

/// Custody of native coin held by the registry.
#[async_trait]
pub trait NativeVault: Send + Sync {
    /// Take a payment attached to a registration into custody.
    async fn collect(&self, from: Address, amount: NativeAmount) -> Result<(), VaultError>;

    /// Pay `amount` out of custody to `to`.
    async fn send(&self, to: Address, amount: NativeAmount) -> Result<(), VaultError>;
}
