//! # Registry State
//!
//! The single state structure every operation handler works on: domain table,
//! ledger, pricing, access control and event log.
//!
//! Handlers validate everything before mutating anything. Registration is
//! split into [`RegistryState::prepare_registration`] (all checks, no
//! mutation) and [`RegistryState::commit_registration`] so that an external
//! token pull can run in between and abort cleanly.

use crate::domain::access::AccessControl;
use crate::domain::entities::{Domain, RateRefreshPolicy, RegistryConfig};
use crate::domain::event_log::EventLog;
use crate::domain::ledger::Ledger;
use crate::domain::pricing::PricingEngine;
use crate::domain::tree::DomainTree;
use crate::domain::value_objects::{ConversionRate, DomainName, Payment, Tender};
use crate::errors::RegistryError;
use shared_bus::{EventRecord, RegistryEvent};
use shared_types::{Address, Currency, NativeAmount, StableAmount};

// =============================================================================
// PLANS
// =============================================================================

/// A fully validated registration awaiting commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPlan {
    /// Name to create.
    pub domain: DomainName,
    /// Payer, and owner of the new domain.
    pub registrant: Address,
    /// Parent's owner, or the administrator for a top-level name.
    pub beneficiary: Address,
    /// Child price the new domain starts with.
    pub child_price: StableAmount,
    /// Minimum price in the tender's currency.
    pub required: Payment,
    /// What gets credited to the beneficiary.
    pub credit: Payment,
}

/// A drained balance whose external payout is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a withdrawal must be completed or reverted"]
pub struct PendingWithdrawal {
    /// Account paid.
    pub account: Address,
    /// Amount drained.
    pub amount: Payment,
}

// =============================================================================
// STATE
// =============================================================================

/// All registry state.
#[derive(Debug, Clone)]
pub struct RegistryState {
    pub(crate) tree: DomainTree,
    pub(crate) ledger: Ledger,
    pub(crate) pricing: PricingEngine,
    pub(crate) access: AccessControl,
    pub(crate) log: EventLog,
}

impl RegistryState {
    /// Fresh state from configuration.
    #[must_use]
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            tree: DomainTree::new(),
            ledger: Ledger::new(),
            pricing: PricingEngine::new(config.initial_domain_price, config.initial_rate),
            access: AccessControl::new(config.administrator, config.rate_refresh_policy),
            log: EventLog::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Validate a registration and work out who gets paid what.
    ///
    /// `child_price` overrides the global default for the new domain.
    ///
    /// # Errors
    ///
    /// `DuplicateDomain`, `ParentDomainDoesNotExists`, `NotEnoughFunds` or
    /// `ArithmeticOverflow`. Nothing is mutated either way.
    pub fn prepare_registration(
        &self,
        registrant: Address,
        domain: DomainName,
        child_price: Option<StableAmount>,
        tender: Tender,
    ) -> Result<RegistrationPlan, RegistryError> {
        let parent = self.tree.check_registrable(&domain)?;
        let beneficiary = parent.map_or(self.access.administrator(), |p| p.owner);
        let price = self.pricing.registration_price(parent);
        let required = self.pricing.quote(price, tender.currency())?;

        let credit = match (tender, required) {
            (Tender::Native(provided), Payment::Native(required)) => {
                if provided < required {
                    return Err(RegistryError::NotEnoughFunds { required, provided });
                }
                Payment::Native(provided)
            }
            (_, required) => required,
        };

        let creditable = match credit {
            Payment::Native(amount) => self.ledger.native.can_credit(&beneficiary, amount),
            Payment::Stable(amount) => self.ledger.stable.can_credit(&beneficiary, amount),
        };
        if !creditable {
            return Err(RegistryError::ArithmeticOverflow {
                context: "ledger credit",
            });
        }

        Ok(RegistrationPlan {
            domain,
            registrant,
            beneficiary,
            child_price: child_price.unwrap_or(self.pricing.global_price()),
            required,
            credit,
        })
    }

    /// Apply a prepared registration: create the domain, credit the
    /// beneficiary, append the event.
    ///
    /// # Errors
    ///
    /// Re-checks the hierarchy and the credit; fails without mutation if the
    /// state moved since the plan was made.
    pub fn commit_registration(
        &mut self,
        plan: RegistrationPlan,
        committed_at: u64,
    ) -> Result<EventRecord, RegistryError> {
        self.tree.check_registrable(&plan.domain)?;
        let creditable = match plan.credit {
            Payment::Native(amount) => self.ledger.native.can_credit(&plan.beneficiary, amount),
            Payment::Stable(amount) => self.ledger.stable.can_credit(&plan.beneficiary, amount),
        };
        if !creditable {
            return Err(RegistryError::ArithmeticOverflow {
                context: "ledger credit",
            });
        }

        let domain_name = plan.domain.to_string();
        self.tree.insert(Domain {
            name: plan.domain,
            owner: plan.registrant,
            child_price: plan.child_price,
        })?;
        match plan.credit {
            Payment::Native(amount) => self.ledger.native.credit(plan.beneficiary, amount),
            Payment::Stable(amount) => self.ledger.stable.credit(plan.beneficiary, amount),
        };

        Ok(self.log.append(
            RegistryEvent::DomainRegistered {
                registrant: plan.registrant,
                owner: plan.registrant,
                domain: domain_name,
                child_price_stable: plan.child_price,
            },
            committed_at,
        ))
    }

    // -------------------------------------------------------------------------
    // Pricing
    // -------------------------------------------------------------------------

    /// Administrator sets the global default price.
    ///
    /// # Errors
    ///
    /// `AccessDenied` for anyone but the administrator.
    pub fn update_domain_price(
        &mut self,
        caller: Address,
        new_price: StableAmount,
        committed_at: u64,
    ) -> Result<EventRecord, RegistryError> {
        self.access.ensure_administrator(caller)?;
        let old_price = self.pricing.set_global_price(new_price);
        Ok(self.log.append(
            RegistryEvent::PriceChanged {
                new_price,
                old_price,
            },
            committed_at,
        ))
    }

    /// A domain's owner sets its child price.
    ///
    /// # Errors
    ///
    /// `AccessDenied` unless `caller` owns `domain`.
    pub fn update_subdomain_price(
        &mut self,
        caller: Address,
        domain: &str,
        new_price: StableAmount,
        committed_at: u64,
    ) -> Result<EventRecord, RegistryError> {
        self.access.ensure_domain_owner(&self.tree, domain, caller)?;
        let old_price = self.tree.set_child_price(domain, new_price)?;
        Ok(self.log.append(
            RegistryEvent::PriceChanged {
                new_price,
                old_price,
            },
            committed_at,
        ))
    }

    /// Check `caller` may refresh the rate.
    ///
    /// # Errors
    ///
    /// `AccessDenied` under an administrator-only policy.
    pub fn ensure_rate_refresher(&self, caller: Address) -> Result<(), RegistryError> {
        self.access.ensure_rate_refresher(caller)
    }

    /// Overwrite the cached rate.
    ///
    /// # Errors
    ///
    /// `Oracle(InvalidRate)` for a zero rate.
    pub fn set_rate(&mut self, rate: ConversionRate) -> Result<ConversionRate, RegistryError> {
        self.pricing.set_rate(rate)
    }

    // -------------------------------------------------------------------------
    // Withdrawal
    // -------------------------------------------------------------------------

    /// Drain `account`'s balance in one currency before paying it out.
    pub fn begin_withdrawal(&mut self, account: Address, currency: Currency) -> PendingWithdrawal {
        let amount = match currency {
            Currency::Native => Payment::Native(self.ledger.native.take(&account)),
            Currency::Stable => Payment::Stable(self.ledger.stable.take(&account)),
        };
        PendingWithdrawal { account, amount }
    }

    /// Put back a drained balance whose payout failed.
    pub fn revert_withdrawal(&mut self, pending: PendingWithdrawal) {
        match pending.amount {
            Payment::Native(amount) => self.ledger.native.restore(pending.account, amount),
            Payment::Stable(amount) => self.ledger.stable.restore(pending.account, amount),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Owner of a domain, `None` when unregistered.
    #[must_use]
    pub fn domain_owner(&self, name: &str) -> Option<Address> {
        self.tree.owner_of(name)
    }

    /// Child price of `name`; the empty name is the global default.
    ///
    /// # Errors
    ///
    /// `DomainNotFound` for an unregistered name.
    pub fn subdomain_price_stable(&self, name: &str) -> Result<StableAmount, RegistryError> {
        if name.is_empty() {
            return Ok(self.pricing.global_price());
        }
        self.tree
            .get(name)
            .map(|d| d.child_price)
            .ok_or_else(|| RegistryError::DomainNotFound(name.to_string()))
    }

    /// Native cost of registering a direct child of `name` right now.
    ///
    /// # Errors
    ///
    /// `DomainNotFound` or `ArithmeticOverflow`.
    pub fn subdomain_price_native(&self, name: &str) -> Result<NativeAmount, RegistryError> {
        self.pricing.to_native(self.subdomain_price_stable(name)?)
    }

    /// Native earnings awaiting withdrawal.
    #[must_use]
    pub fn native_earnings(&self, owner: &Address) -> NativeAmount {
        self.ledger.native.balance_of(owner)
    }

    /// Stablecoin earnings awaiting withdrawal.
    #[must_use]
    pub fn stable_earnings(&self, owner: &Address) -> StableAmount {
        self.ledger.stable.balance_of(owner)
    }

    /// The current rate.
    #[must_use]
    pub fn rate(&self) -> ConversionRate {
        self.pricing.rate()
    }

    /// The administrator.
    #[must_use]
    pub fn administrator(&self) -> Address {
        self.access.administrator()
    }

    /// Who may refresh the rate.
    #[must_use]
    pub fn refresh_policy(&self) -> RateRefreshPolicy {
        self.access.refresh_policy()
    }

    /// The event log.
    #[must_use]
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// The ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Number of registered domains.
    #[must_use]
    pub fn domain_count(&self) -> usize {
        self.tree.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event_log::OwnershipProjection;
    use shared_types::U256;

    const ADMIN: Address = Address::repeat_byte(0xAD);
    const ALICE: Address = Address::repeat_byte(1);
    const BOB: Address = Address::repeat_byte(2);

    fn state(price: u64) -> RegistryState {
        RegistryState::new(&RegistryConfig::new(ADMIN, StableAmount::from(price)))
    }

    fn name(raw: &str) -> DomainName {
        DomainName::parse(raw).unwrap()
    }

    fn register_native(
        state: &mut RegistryState,
        caller: Address,
        raw: &str,
        paid: u64,
    ) -> Result<EventRecord, RegistryError> {
        let plan = state.prepare_registration(
            caller,
            name(raw),
            None,
            Tender::Native(NativeAmount::from(paid)),
        )?;
        state.commit_registration(plan, 0)
    }

    #[test]
    fn test_top_level_credits_administrator() {
        let mut state = state(6);
        let record = register_native(&mut state, ALICE, "com", 6).unwrap();

        assert_eq!(record.sequence, 0);
        assert_eq!(state.domain_owner("com"), Some(ALICE));
        assert_eq!(state.native_earnings(&ADMIN), NativeAmount::from(6u64));
        assert_eq!(state.native_earnings(&ALICE), NativeAmount::ZERO);
    }

    #[test]
    fn test_child_credits_parent_owner_full_payment() {
        let mut state = state(6);
        register_native(&mut state, ALICE, "com", 6).unwrap();
        // Overpayment is kept in full.
        register_native(&mut state, BOB, "a.com", 10).unwrap();

        assert_eq!(state.native_earnings(&ALICE), NativeAmount::from(10u64));
        assert_eq!(state.domain_owner("a.com"), Some(BOB));
    }

    #[test]
    fn test_payment_boundary() {
        let mut state = state(6);
        let err = register_native(&mut state, ALICE, "com", 5).unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotEnoughFunds {
                required: NativeAmount::from(6u64),
                provided: NativeAmount::from(5u64),
            }
        );
        assert!(state.log().is_empty());
        assert_eq!(state.domain_owner("com"), None);

        assert!(register_native(&mut state, ALICE, "com", 6).is_ok());
    }

    #[test]
    fn test_duplicate_leaves_state_unchanged() {
        let mut state = state(6);
        register_native(&mut state, ALICE, "com", 6).unwrap();

        let err = register_native(&mut state, BOB, "com", 100).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateDomain("com".into()));
        assert_eq!(state.domain_owner("com"), Some(ALICE));
        assert_eq!(state.native_earnings(&ADMIN), NativeAmount::from(6u64));
        assert_eq!(state.log().len(), 1);
    }

    #[test]
    fn test_stable_tender_requires_exact_price() {
        let mut state = state(6);
        register_native(&mut state, ALICE, "com", 6).unwrap();
        state
            .update_subdomain_price(ALICE, "com", StableAmount::from(4u64), 0)
            .unwrap();

        let plan = state
            .prepare_registration(BOB, name("b.com"), Some(StableAmount::from(1u64)), Tender::Stable)
            .unwrap();
        assert_eq!(plan.required, Payment::Stable(StableAmount::from(4u64)));
        assert_eq!(plan.credit, plan.required);
        assert_eq!(plan.beneficiary, ALICE);

        let record = state.commit_registration(plan, 0).unwrap();
        assert_eq!(state.stable_earnings(&ALICE), StableAmount::from(4u64));
        assert_eq!(state.native_earnings(&ALICE), NativeAmount::ZERO);
        assert!(matches!(
            record.event,
            RegistryEvent::DomainRegistered { child_price_stable, .. }
                if child_price_stable == StableAmount::from(1u64)
        ));
        assert_eq!(
            state.subdomain_price_stable("b.com").unwrap(),
            StableAmount::from(1u64)
        );
    }

    #[test]
    fn test_new_domain_defaults_to_global_price() {
        let mut state = state(6);
        register_native(&mut state, ALICE, "com", 6).unwrap();
        assert_eq!(
            state.subdomain_price_stable("com").unwrap(),
            StableAmount::from(6u64)
        );
    }

    #[test]
    fn test_stale_plan_is_rejected_on_commit() {
        let mut state = state(6);
        let plan = state
            .prepare_registration(ALICE, name("com"), None, Tender::Native(NativeAmount::from(6u64)))
            .unwrap();
        register_native(&mut state, BOB, "com", 6).unwrap();

        assert_eq!(
            state.commit_registration(plan, 0),
            Err(RegistryError::DuplicateDomain("com".into()))
        );
        assert_eq!(state.native_earnings(&ADMIN), NativeAmount::from(6u64));
    }

    #[test]
    fn test_ledger_overflow_rejected_before_mutation() {
        let mut state = state(0);
        register_native(&mut state, ALICE, "com", 0).unwrap();
        state
            .ledger
            .native
            .credit(ADMIN, NativeAmount::new(U256::MAX));

        let err = state
            .prepare_registration(BOB, name("net"), None, Tender::Native(NativeAmount::from(1u64)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::ArithmeticOverflow { .. }));
        assert_eq!(state.domain_owner("net"), None);
    }

    #[test]
    fn test_price_updates_and_access() {
        let mut state = state(6);
        register_native(&mut state, ALICE, "com", 6).unwrap();

        let err = state
            .update_subdomain_price(BOB, "com", StableAmount::from(1u64), 0)
            .unwrap_err();
        assert_eq!(err, RegistryError::AccessDenied { caller: BOB });
        assert_eq!(
            state.subdomain_price_stable("com").unwrap(),
            StableAmount::from(6u64)
        );

        let record = state
            .update_subdomain_price(ALICE, "com", StableAmount::from(9u64), 0)
            .unwrap();
        assert_eq!(
            record.event,
            RegistryEvent::PriceChanged {
                new_price: StableAmount::from(9u64),
                old_price: StableAmount::from(6u64),
            }
        );
        assert_eq!(
            state.subdomain_price_native("com").unwrap(),
            NativeAmount::from(9u64)
        );

        assert!(state
            .update_domain_price(ALICE, StableAmount::from(1u64), 0)
            .is_err());
        state
            .update_domain_price(ADMIN, StableAmount::from(1u64), 0)
            .unwrap();
        assert_eq!(state.subdomain_price_stable("").unwrap(), StableAmount::from(1u64));
    }

    #[test]
    fn test_price_query_unknown_domain() {
        let state = state(6);
        assert_eq!(
            state.subdomain_price_stable("nope"),
            Err(RegistryError::DomainNotFound("nope".into()))
        );
    }

    #[test]
    fn test_withdrawal_drains_and_reverts() {
        let mut state = state(6);
        register_native(&mut state, ALICE, "com", 6).unwrap();

        let pending = state.begin_withdrawal(ADMIN, Currency::Native);
        assert_eq!(pending.amount, Payment::Native(NativeAmount::from(6u64)));
        assert_eq!(state.native_earnings(&ADMIN), NativeAmount::ZERO);

        state.revert_withdrawal(pending);
        assert_eq!(state.native_earnings(&ADMIN), NativeAmount::from(6u64));
        assert!(state.ledger().is_solvent());

        let pending = state.begin_withdrawal(ADMIN, Currency::Native);
        assert!(!pending.amount.is_zero());
        let again = state.begin_withdrawal(ADMIN, Currency::Native);
        assert!(again.amount.is_zero());
    }

    #[test]
    fn test_log_replay_matches_state() {
        let mut state = state(1);
        register_native(&mut state, ALICE, "com", 1).unwrap();
        register_native(&mut state, BOB, "net", 1).unwrap();
        register_native(&mut state, BOB, "a.com", 1).unwrap();
        state
            .update_domain_price(ADMIN, StableAmount::from(2u64), 0)
            .unwrap();
        register_native(&mut state, ALICE, "b.net", 1).unwrap();

        let projection = OwnershipProjection::replay(state.log().records());
        for (domain, owner) in &projection.owners {
            assert_eq!(state.domain_owner(domain), Some(*owner));
        }
        assert_eq!(projection.owners.len(), state.domain_count());
        assert_eq!(
            projection.domains_by_owner[&BOB],
            vec!["net".to_string(), "a.com".to_string()]
        );
    }
}
