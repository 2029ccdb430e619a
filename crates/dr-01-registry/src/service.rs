//! # Domain Registry Service
//!
//! Wires the domain layer to the outbound ports and the event bus.
//!
//! One `tokio::sync::Mutex` around [`RegistryState`] is held for the whole of
//! every public operation, external calls included. Operations therefore
//! never interleave, and an event is published to the bus in the same
//! critical section that appended it to the log.

use crate::adapters::{FixedRateOracle, InMemoryNativeVault, InMemoryStablecoin};
use crate::domain::entities::RegistryConfig;
use crate::domain::snapshot::RegistrySnapshot;
use crate::domain::state::RegistryState;
use crate::domain::value_objects::{ConversionRate, DomainName, Payment, Tender};
use crate::errors::{RegistryError, SnapshotError};
use crate::feed::RegistryFeed;
use crate::ports::inbound::DomainRegistryApi;
use crate::ports::outbound::{NativeVault, PriceOracle, StablecoinToken};

use async_trait::async_trait;
use shared_bus::{EventFilter, EventPublisher, EventRecord, InMemoryEventBus};
use shared_types::{Address, Currency, NativeAmount, StableAmount};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Statistics for the registry service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Successful registrations, both currencies.
    pub registrations: u64,
    /// Successful global or per-domain price updates.
    pub price_updates: u64,
    /// Successful withdrawals, zero-amount ones included.
    pub withdrawals: u64,
    /// Successful oracle refreshes.
    pub rate_refreshes: u64,
    /// Operations that failed for any reason.
    pub rejected_operations: u64,
}

/// In-memory wiring used by tests and the standalone node.
pub type InMemoryRegistry =
    DomainRegistryService<FixedRateOracle, InMemoryStablecoin, InMemoryNativeVault>;

/// Account the in-memory stablecoin treats as the registry.
pub const IN_MEMORY_REGISTRY_ACCOUNT: Address = Address::repeat_byte(0xEE);

/// The main registry service.
pub struct DomainRegistryService<O: PriceOracle, T: StablecoinToken, V: NativeVault> {
    state: Arc<Mutex<RegistryState>>,
    bus: Arc<InMemoryEventBus>,
    oracle: Arc<O>,
    token: Arc<T>,
    vault: Arc<V>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl<O: PriceOracle, T: StablecoinToken, V: NativeVault> DomainRegistryService<O, T, V> {
    /// Create a registry with empty state.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration does not validate.
    pub fn new(
        config: &RegistryConfig,
        oracle: Arc<O>,
        token: Arc<T>,
        vault: Arc<V>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;
        info!(
            administrator = %config.administrator,
            domain_price = %config.initial_domain_price,
            rate = %config.initial_rate,
            refresh_policy = ?config.rate_refresh_policy,
            "Domain registry created"
        );
        Ok(Self::assemble(
            RegistryState::new(config),
            config.event_bus_capacity,
            oracle,
            token,
            vault,
        ))
    }

    /// Restore a registry from a snapshot.
    ///
    /// # Errors
    ///
    /// Any [`SnapshotError`] raised while validating the snapshot.
    pub fn from_snapshot(
        snapshot: RegistrySnapshot,
        event_bus_capacity: usize,
        oracle: Arc<O>,
        token: Arc<T>,
        vault: Arc<V>,
    ) -> Result<Self, SnapshotError> {
        let state = RegistryState::from_snapshot(snapshot)?;
        info!(
            domains = state.domain_count(),
            events = state.log().len(),
            "Domain registry restored from snapshot"
        );
        Ok(Self::assemble(state, event_bus_capacity, oracle, token, vault))
    }

    fn assemble(
        state: RegistryState,
        event_bus_capacity: usize,
        oracle: Arc<O>,
        token: Arc<T>,
        vault: Arc<V>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            bus: Arc::new(InMemoryEventBus::with_capacity(event_bus_capacity)),
            oracle,
            token,
            vault,
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Capture the full state.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        self.state.lock().await.to_snapshot()
    }

    /// The cached conversion rate.
    pub async fn rate(&self) -> ConversionRate {
        self.state.lock().await.rate()
    }

    /// The administrator.
    pub async fn administrator(&self) -> Address {
        self.state.lock().await.administrator()
    }

    /// True when both ledger books balance.
    pub async fn is_solvent(&self) -> bool {
        self.state.lock().await.ledger().is_solvent()
    }

    /// The live event bus.
    #[must_use]
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    /// The oracle adapter.
    #[must_use]
    pub fn oracle(&self) -> &Arc<O> {
        &self.oracle
    }

    /// The stablecoin adapter.
    #[must_use]
    pub fn token(&self) -> &Arc<T> {
        &self.token
    }

    /// The native vault adapter.
    #[must_use]
    pub fn vault(&self) -> &Arc<V> {
        &self.vault
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Register paying native coin.
    #[instrument(skip(self), fields(caller = %caller, payment = %payment))]
    async fn register_native(
        &self,
        caller: Address,
        name: &str,
        child_price: Option<StableAmount>,
        payment: NativeAmount,
    ) -> Result<EventRecord, RegistryError> {
        let result = async {
            let domain = DomainName::parse(name)?;
            let mut state = self.state.lock().await;
            let plan =
                state.prepare_registration(caller, domain, child_price, Tender::Native(payment))?;

            self.vault.collect(caller, payment).await?;

            let record = match state.commit_registration(plan, unix_now()) {
                Ok(record) => record,
                Err(err) => {
                    if let Err(refund) = self.vault.send(caller, payment).await {
                        warn!(error = %refund, "Refund after failed commit did not go through");
                    }
                    return Err(err);
                }
            };
            self.bus.publish(record.clone()).await;
            Ok::<_, RegistryError>(record)
        }
        .await;

        self.tally(&result, |stats| stats.registrations += 1).await;
        if let Ok(record) = &result {
            info!(sequence = record.sequence, domain = name, "Domain registered (native)");
        }
        result
    }

    /// Register paying stablecoin from the caller's allowance.
    #[instrument(skip(self), fields(caller = %caller))]
    async fn register_stable(
        &self,
        caller: Address,
        name: &str,
        child_price: StableAmount,
    ) -> Result<EventRecord, RegistryError> {
        let result = async {
            let domain = DomainName::parse(name)?;
            let mut state = self.state.lock().await;
            let plan =
                state.prepare_registration(caller, domain, Some(child_price), Tender::Stable)?;
            let price = plan.required.stable().unwrap_or_default();

            self.token.transfer_from(caller, price).await?;

            let record = match state.commit_registration(plan, unix_now()) {
                Ok(record) => record,
                Err(err) => {
                    if let Err(refund) = self.token.transfer(caller, price).await {
                        warn!(error = %refund, "Refund after failed commit did not go through");
                    }
                    return Err(err);
                }
            };
            self.bus.publish(record.clone()).await;
            Ok::<_, RegistryError>(record)
        }
        .await;

        self.tally(&result, |stats| stats.registrations += 1).await;
        if let Ok(record) = &result {
            info!(sequence = record.sequence, domain = name, "Domain registered (usdc)");
        }
        result
    }

    #[instrument(skip(self), fields(caller = %caller, new_price = %new_price))]
    async fn set_domain_price(
        &self,
        caller: Address,
        new_price: StableAmount,
    ) -> Result<EventRecord, RegistryError> {
        let result = async {
            let mut state = self.state.lock().await;
            let record = state.update_domain_price(caller, new_price, unix_now())?;
            self.bus.publish(record.clone()).await;
            Ok::<_, RegistryError>(record)
        }
        .await;

        self.tally(&result, |stats| stats.price_updates += 1).await;
        if result.is_ok() {
            info!("Global domain price updated");
        }
        result
    }

    #[instrument(skip(self), fields(caller = %caller, new_price = %new_price))]
    async fn set_subdomain_price(
        &self,
        caller: Address,
        new_price: StableAmount,
        domain: &str,
    ) -> Result<EventRecord, RegistryError> {
        let result = async {
            let mut state = self.state.lock().await;
            let record = state.update_subdomain_price(caller, domain, new_price, unix_now())?;
            self.bus.publish(record.clone()).await;
            Ok::<_, RegistryError>(record)
        }
        .await;

        self.tally(&result, |stats| stats.price_updates += 1).await;
        if result.is_ok() {
            info!(domain = domain, "Subdomain price updated");
        }
        result
    }

    #[instrument(skip(self), fields(caller = %caller))]
    async fn refresh_rate(&self, caller: Address) -> Result<ConversionRate, RegistryError> {
        let result = async {
            let mut state = self.state.lock().await;
            state.ensure_rate_refresher(caller)?;
            let rate = self.oracle.latest_rate().await?;
            let old = state.set_rate(rate)?;
            info!(old = %old, new = %rate, "Conversion rate refreshed");
            Ok::<_, RegistryError>(rate)
        }
        .await;

        self.tally(&result, |stats| stats.rate_refreshes += 1).await;
        result
    }

    /// Pay out the caller's whole balance in one currency.
    ///
    /// The balance is zeroed before the transfer; if the transfer fails it is
    /// restored and the error returned.
    ///
    /// # Errors
    ///
    /// `Vault` or `Stablecoin` when the payout fails.
    #[instrument(skip(self), fields(caller = %caller, currency = %currency))]
    pub async fn withdraw_in(
        &self,
        caller: Address,
        currency: Currency,
    ) -> Result<Payment, RegistryError> {
        let result = async {
            let mut state = self.state.lock().await;
            let pending = state.begin_withdrawal(caller, currency);

            if pending.amount.is_zero() {
                debug!("Nothing to withdraw");
                return Ok(pending.amount);
            }

            let payout = match pending.amount {
                Payment::Native(amount) => self
                    .vault
                    .send(caller, amount)
                    .await
                    .map_err(RegistryError::from),
                Payment::Stable(amount) => self
                    .token
                    .transfer(caller, amount)
                    .await
                    .map_err(RegistryError::from),
            };
            if let Err(err) = payout {
                state.revert_withdrawal(pending);
                return Err(err);
            }
            Ok::<_, RegistryError>(pending.amount)
        }
        .await;

        self.tally(&result, |stats| stats.withdrawals += 1).await;
        if let Ok(amount) = &result {
            info!(amount = %amount, "Withdrawal paid");
        }
        result
    }

    async fn tally<R>(
        &self,
        result: &Result<R, RegistryError>,
        on_success: impl FnOnce(&mut ServiceStats) + Send,
    ) where
        R: Sync,
    {
        let mut stats = self.stats.write().await;
        match result {
            Ok(_) => on_success(&mut stats),
            Err(err) => {
                stats.rejected_operations += 1;
                warn!(error = %err, kind = err.kind(), "Registry operation rejected");
            }
        }
    }
}

/// Commit time in unix seconds.
fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

// =============================================================================
// TEST HELPERS
// =============================================================================

/// Create an in-memory registry for testing.
///
/// The oracle answers parity, so native and stable prices coincide.
///
/// # Errors
///
/// `InvalidConfig` for a zero administrator.
pub fn create_test_service(
    administrator: Address,
    domain_price: StableAmount,
) -> Result<InMemoryRegistry, RegistryError> {
    DomainRegistryService::new(
        &RegistryConfig::new(administrator, domain_price),
        Arc::new(FixedRateOracle::default()),
        Arc::new(InMemoryStablecoin::new(IN_MEMORY_REGISTRY_ACCOUNT)),
        Arc::new(InMemoryNativeVault::new()),
    )
}

// =============================================================================
// DomainRegistryApi Implementation
// =============================================================================

#[async_trait]
impl<O: PriceOracle, T: StablecoinToken, V: NativeVault> DomainRegistryApi
    for DomainRegistryService<O, T, V>
{
    async fn register_domain(
        &self,
        caller: Address,
        name: &str,
        payment: NativeAmount,
    ) -> Result<EventRecord, RegistryError> {
        self.register_native(caller, name, None, payment).await
    }

    async fn register_domain_with_price(
        &self,
        caller: Address,
        name: &str,
        child_price: StableAmount,
        payment: NativeAmount,
    ) -> Result<EventRecord, RegistryError> {
        self.register_native(caller, name, Some(child_price), payment)
            .await
    }

    async fn register_domain_usdc(
        &self,
        caller: Address,
        name: &str,
        child_price: StableAmount,
    ) -> Result<EventRecord, RegistryError> {
        self.register_stable(caller, name, child_price).await
    }

    async fn update_domain_price(
        &self,
        caller: Address,
        new_price: StableAmount,
    ) -> Result<EventRecord, RegistryError> {
        self.set_domain_price(caller, new_price).await
    }

    async fn update_subdomain_price(
        &self,
        caller: Address,
        new_price: StableAmount,
        domain: &str,
    ) -> Result<EventRecord, RegistryError> {
        self.set_subdomain_price(caller, new_price, domain).await
    }

    async fn update_usdc2eth_rate(&self, caller: Address) -> Result<ConversionRate, RegistryError> {
        self.refresh_rate(caller).await
    }

    async fn subdomain_price_wei(&self, domain: &str) -> Result<NativeAmount, RegistryError> {
        self.state.lock().await.subdomain_price_native(domain)
    }

    async fn subdomain_price_eth(&self, domain: &str) -> Result<String, RegistryError> {
        Ok(self.subdomain_price_wei(domain).await?.format_units())
    }

    async fn subdomain_price_usdc(&self, domain: &str) -> Result<StableAmount, RegistryError> {
        self.state.lock().await.subdomain_price_stable(domain)
    }

    async fn domain_owner(&self, domain: &str) -> Option<Address> {
        self.state.lock().await.domain_owner(domain)
    }

    async fn domain_owner_earnings_eth(&self, owner: Address) -> NativeAmount {
        self.state.lock().await.native_earnings(&owner)
    }

    async fn domain_owner_earnings_usdc(&self, owner: Address) -> StableAmount {
        self.state.lock().await.stable_earnings(&owner)
    }

    async fn withdraw(&self, caller: Address) -> Result<NativeAmount, RegistryError> {
        let paid = self.withdraw_in(caller, Currency::Native).await?;
        Ok(paid.native().unwrap_or_default())
    }

    async fn withdraw_usdc(&self, caller: Address) -> Result<StableAmount, RegistryError> {
        let paid = self.withdraw_in(caller, Currency::Stable).await?;
        Ok(paid.stable().unwrap_or_default())
    }

    async fn events_from(&self, from: u64) -> Vec<EventRecord> {
        self.state.lock().await.log().events_from(from).to_vec()
    }

    async fn registrations_by_owner(&self, owner: Address, from: u64) -> Vec<EventRecord> {
        self.state
            .lock()
            .await
            .log()
            .registrations_by_owner(owner, from)
    }

    async fn open_feed(&self, filter: EventFilter, from: u64) -> RegistryFeed {
        let state = self.state.lock().await;
        let subscription = self.bus.subscribe(filter.clone());
        let backlog: Vec<EventRecord> = state.log().query(&filter, from).cloned().collect();
        drop(state);

        debug!(backlog = backlog.len(), from = from, "Registry feed opened");
        RegistryFeed::new(backlog, subscription, filter, from, Arc::clone(&self.state))
    }
}
