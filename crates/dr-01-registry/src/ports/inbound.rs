//! # Driving Ports (API - Inbound)
//!
//! The public surface of the registry. Every mutating operation takes the
//! calling account explicitly; authorization is decided from that identity
//! against stored state on every call.
//!
//! Names follow the deployed interface: `wei`/`eth` mean native units,
//! `usdc` means stablecoin units.

use crate::domain::value_objects::ConversionRate;
use crate::errors::RegistryError;
use crate::feed::RegistryFeed;
use async_trait::async_trait;
use shared_bus::{EventFilter, EventRecord};
use shared_types::{Address, NativeAmount, StableAmount};

// =============================================================================
// DOMAIN REGISTRY API (Primary Driving Port)
// =============================================================================

/// Primary API of the domain registry.
///
/// ## Usage
///
/// ```ignore
/// let record = api.register_domain(alice, "shop", payment).await?;
/// assert_eq!(api.domain_owner("shop").await, Some(alice));
/// ```
#[async_trait]
pub trait DomainRegistryApi: Send + Sync {
    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Register `name` paying `payment` in native coin. The new domain's
    /// child price starts at the global default.
    ///
    /// # Errors
    ///
    /// `EmptyDomainName`, `InvalidDomainName`, `DuplicateDomain`,
    /// `ParentDomainDoesNotExists`, `NotEnoughFunds`, `ArithmeticOverflow`,
    /// or `Vault` if the payment cannot be collected.
    async fn register_domain(
        &self,
        caller: Address,
        name: &str,
        payment: NativeAmount,
    ) -> Result<EventRecord, RegistryError>;

    /// As [`DomainRegistryApi::register_domain`], also setting the new
    /// domain's child price.
    async fn register_domain_with_price(
        &self,
        caller: Address,
        name: &str,
        child_price: StableAmount,
        payment: NativeAmount,
    ) -> Result<EventRecord, RegistryError>;

    /// Register `name` paying exactly the stable price from the caller's
    /// allowance.
    ///
    /// # Errors
    ///
    /// As for native registration, with `Stablecoin` in place of `Vault`.
    async fn register_domain_usdc(
        &self,
        caller: Address,
        name: &str,
        child_price: StableAmount,
    ) -> Result<EventRecord, RegistryError>;

    // -------------------------------------------------------------------------
    // Pricing
    // -------------------------------------------------------------------------

    /// Set the global default price. Administrator only.
    async fn update_domain_price(
        &self,
        caller: Address,
        new_price: StableAmount,
    ) -> Result<EventRecord, RegistryError>;

    /// Set a domain's child price. Domain owner only.
    async fn update_subdomain_price(
        &self,
        caller: Address,
        new_price: StableAmount,
        domain: &str,
    ) -> Result<EventRecord, RegistryError>;

    /// Re-read the rate from the oracle and cache it.
    async fn update_usdc2eth_rate(&self, caller: Address) -> Result<ConversionRate, RegistryError>;

    /// Native cost of a direct child of `domain` (`""` for top-level).
    async fn subdomain_price_wei(&self, domain: &str) -> Result<NativeAmount, RegistryError>;

    /// [`DomainRegistryApi::subdomain_price_wei`] rendered in whole coins.
    async fn subdomain_price_eth(&self, domain: &str) -> Result<String, RegistryError>;

    /// Stable child price of `domain` (`""` for the global default).
    async fn subdomain_price_usdc(&self, domain: &str) -> Result<StableAmount, RegistryError>;

    // -------------------------------------------------------------------------
    // Ownership and earnings
    // -------------------------------------------------------------------------

    /// Owner of `domain`; `None` when it is not registered.
    async fn domain_owner(&self, domain: &str) -> Option<Address>;

    /// Native balance awaiting withdrawal.
    async fn domain_owner_earnings_eth(&self, owner: Address) -> NativeAmount;

    /// Stablecoin balance awaiting withdrawal.
    async fn domain_owner_earnings_usdc(&self, owner: Address) -> StableAmount;

    /// Pay the caller's whole native balance to the caller.
    ///
    /// A zero balance succeeds and pays zero.
    ///
    /// # Errors
    ///
    /// `Vault` if the payout fails; the balance is then left untouched.
    async fn withdraw(&self, caller: Address) -> Result<NativeAmount, RegistryError>;

    /// Pay the caller's whole stablecoin balance to the caller.
    ///
    /// # Errors
    ///
    /// `Stablecoin` if the transfer fails; the balance is then left untouched.
    async fn withdraw_usdc(&self, caller: Address) -> Result<StableAmount, RegistryError>;

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Every committed event from sequence `from` onward.
    async fn events_from(&self, from: u64) -> Vec<EventRecord>;

    /// Registrations naming `owner`, from sequence `from` onward.
    async fn registrations_by_owner(&self, owner: Address, from: u64) -> Vec<EventRecord>;

    /// Replay from `from` followed by live events, each exactly once.
    async fn open_feed(&self, filter: EventFilter, from: u64) -> RegistryFeed;
}
