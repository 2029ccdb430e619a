//! # Snapshots and Migration
//!
//! The whole registry state as a serde document, plus the first
//! single-currency schema and its explicit migration to the current one.
//!
//! | Version | Prices | Ledger |
//! |---------|--------|--------|
//! | 1 | native units | native only |
//! | 2 | stablecoin units | native and stablecoin |

use crate::domain::access::AccessControl;
use crate::domain::entities::{Domain, RateRefreshPolicy};
use crate::domain::event_log::{EventLog, OwnershipProjection};
use crate::domain::ledger::{CurrencyBook, Ledger, LedgerAmount};
use crate::domain::pricing::PricingEngine;
use crate::domain::state::RegistryState;
use crate::domain::tree::DomainTree;
use crate::domain::value_objects::{ConversionRate, DomainName};
use crate::errors::SnapshotError;
use serde::{Deserialize, Serialize};
use shared_bus::{EventRecord, RegistryEvent};
use shared_types::{Address, NativeAmount, StableAmount};
use std::collections::HashMap;

/// Current schema version.
pub const SNAPSHOT_VERSION: u64 = 2;

/// Version of the single-currency schema.
pub const SNAPSHOT_V1_VERSION: u64 = 1;

// =============================================================================
// CURRENT SCHEMA
// =============================================================================

/// One currency book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot<A> {
    /// Non-zero balances.
    pub balances: Vec<(Address, A)>,
    /// Total ever credited.
    pub received: A,
    /// Total ever paid out.
    pub paid_out: A,
}

impl<A: LedgerAmount> BookSnapshot<A> {
    fn capture(book: &CurrencyBook<A>) -> Self {
        Self {
            balances: book.entries(),
            received: book.received(),
            paid_out: book.paid_out(),
        }
    }

    /// What owners can still withdraw: everything received minus everything
    /// paid out. `None` when the figures cannot be from a solvent book.
    #[must_use]
    pub fn outstanding(&self) -> Option<A> {
        self.received.checked_sub(self.paid_out)
    }

    fn restore(self) -> Result<CurrencyBook<A>, SnapshotError> {
        let mut balances = HashMap::with_capacity(self.balances.len());
        for (account, amount) in self.balances {
            if balances.insert(account, amount).is_some() {
                return Err(SnapshotError::Inconsistent(format!(
                    "{} ledger lists {account} twice",
                    A::CURRENCY
                )));
            }
        }
        let book = CurrencyBook::from_parts(balances, self.received, self.paid_out);
        if book.is_solvent() {
            Ok(book)
        } else {
            Err(SnapshotError::Insolvent(A::CURRENCY))
        }
    }
}

/// The full registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Always [`SNAPSHOT_VERSION`].
    pub version: u64,
    /// The administrator.
    pub administrator: Address,
    /// Global default price.
    pub global_price: StableAmount,
    /// Cached conversion rate.
    pub rate: ConversionRate,
    /// Rate refresh policy.
    pub refresh_policy: RateRefreshPolicy,
    /// Domains, parents before children.
    pub domains: Vec<Domain>,
    /// Native book.
    pub native_ledger: BookSnapshot<NativeAmount>,
    /// Stablecoin book.
    pub stable_ledger: BookSnapshot<StableAmount>,
    /// The event log.
    pub events: Vec<EventRecord>,
}

impl RegistrySnapshot {
    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a current-schema document.
    ///
    /// # Errors
    ///
    /// `UnsupportedVersion` for anything but [`SNAPSHOT_VERSION`], `Decode` on
    /// malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}

// =============================================================================
// FIRST SCHEMA
// =============================================================================

/// A domain in the first schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainV1 {
    /// Full dotted name.
    pub name: String,
    /// Owner.
    pub owner: Address,
    /// Child price in native units.
    pub subdomain_price: NativeAmount,
}

/// Events in the first schema. Registrations carried no price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventV1 {
    /// A domain was registered.
    DomainRegistered {
        /// Payer.
        registrant: Address,
        /// Owner.
        owner: Address,
        /// Full dotted name.
        domain: String,
    },
    /// A price changed, native units.
    PriceChanged {
        /// New price.
        new_price: NativeAmount,
        /// Previous price.
        old_price: NativeAmount,
    },
}

/// A logged event in the first schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecordV1 {
    /// Log position.
    pub sequence: u64,
    /// Commit time, unix seconds.
    pub committed_at: u64,
    /// The event.
    pub event: EventV1,
}

/// The single-currency state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV1 {
    /// Always [`SNAPSHOT_V1_VERSION`].
    pub version: u64,
    /// The administrator.
    pub administrator: Address,
    /// Global default price in native units.
    pub domain_price: NativeAmount,
    /// Registered domains.
    pub domains: Vec<DomainV1>,
    /// Native book.
    pub earnings: BookSnapshot<NativeAmount>,
    /// The event log.
    pub events: Vec<EventRecordV1>,
}

/// Lift a first-schema state into the current schema.
///
/// Price figures are carried over unchanged and become stablecoin figures,
/// earnings move to the native book, the stablecoin book starts empty and
/// `rate` becomes the cached rate. With [`ConversionRate::parity`] every
/// native quote stays what it was. A migrated registration event records the
/// child price its domain has at migration time.
///
/// # Errors
///
/// `UnsupportedVersion` unless `v1.version` is [`SNAPSHOT_V1_VERSION`];
/// `Inconsistent` if an event names a domain that is not in the table.
pub fn migrate_v1(
    v1: SnapshotV1,
    rate: ConversionRate,
) -> Result<RegistrySnapshot, SnapshotError> {
    if v1.version != SNAPSHOT_V1_VERSION {
        return Err(SnapshotError::UnsupportedVersion(v1.version));
    }

    let mut domains = Vec::with_capacity(v1.domains.len());
    let mut child_prices = HashMap::with_capacity(v1.domains.len());
    for d in v1.domains {
        let name = DomainName::parse(&d.name)
            .map_err(|e| SnapshotError::Inconsistent(e.to_string()))?;
        let child_price = StableAmount::new(d.subdomain_price.raw());
        child_prices.insert(d.name, child_price);
        domains.push(Domain {
            name,
            owner: d.owner,
            child_price,
        });
    }

    let events = v1
        .events
        .into_iter()
        .map(|record| -> Result<EventRecord, SnapshotError> {
            let event = match record.event {
                EventV1::DomainRegistered {
                    registrant,
                    owner,
                    domain,
                } => {
                    let child_price_stable = *child_prices.get(&domain).ok_or_else(|| {
                        SnapshotError::Inconsistent(format!("event names unknown domain {domain}"))
                    })?;
                    RegistryEvent::DomainRegistered {
                        registrant,
                        owner,
                        domain,
                        child_price_stable,
                    }
                }
                EventV1::PriceChanged {
                    new_price,
                    old_price,
                } => RegistryEvent::PriceChanged {
                    new_price: StableAmount::new(new_price.raw()),
                    old_price: StableAmount::new(old_price.raw()),
                },
            };
            Ok(EventRecord {
                sequence: record.sequence,
                committed_at: record.committed_at,
                event,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RegistrySnapshot {
        version: SNAPSHOT_VERSION,
        administrator: v1.administrator,
        global_price: StableAmount::new(v1.domain_price.raw()),
        rate,
        refresh_policy: RateRefreshPolicy::default(),
        domains,
        native_ledger: v1.earnings,
        stable_ledger: BookSnapshot {
            balances: Vec::new(),
            received: StableAmount::ZERO,
            paid_out: StableAmount::ZERO,
        },
        events,
    })
}

/// Decode either schema, migrating the first with `migration_rate`.
///
/// # Errors
///
/// `Decode`, `UnsupportedVersion`, or migration errors.
pub fn decode_snapshot(
    json: &str,
    migration_rate: ConversionRate,
) -> Result<RegistrySnapshot, SnapshotError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or_default();
    match version {
        SNAPSHOT_V1_VERSION => migrate_v1(serde_json::from_value(value)?, migration_rate),
        SNAPSHOT_VERSION => Ok(serde_json::from_value(value)?),
        other => Err(SnapshotError::UnsupportedVersion(other)),
    }
}

// =============================================================================
// STATE CONVERSION
// =============================================================================

impl RegistryState {
    /// Capture the full state.
    #[must_use]
    pub fn to_snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            version: SNAPSHOT_VERSION,
            administrator: self.access.administrator(),
            global_price: self.pricing.global_price(),
            rate: self.pricing.rate(),
            refresh_policy: self.access.refresh_policy(),
            domains: self.tree.sorted().into_iter().cloned().collect(),
            native_ledger: BookSnapshot::capture(&self.ledger.native),
            stable_ledger: BookSnapshot::capture(&self.ledger.stable),
            events: self.log.records().to_vec(),
        }
    }

    /// Rebuild and validate state from a snapshot.
    ///
    /// # Errors
    ///
    /// `UnsupportedVersion`, `Inconsistent` (broken hierarchy, sequence gaps,
    /// log and table disagreeing, unusable rate) or `Insolvent`.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        if !snapshot.rate.is_usable() {
            return Err(SnapshotError::Inconsistent("conversion rate is zero".into()));
        }

        let mut domains = snapshot.domains;
        domains.sort_by_key(|d| d.name.depth());
        let mut tree = DomainTree::new();
        for domain in domains {
            tree.insert(domain)
                .map_err(|e| SnapshotError::Inconsistent(e.to_string()))?;
        }

        let log = EventLog::from_records(snapshot.events)
            .ok_or_else(|| SnapshotError::Inconsistent("event sequence has gaps".into()))?;
        let projection = OwnershipProjection::replay(log.records());
        let table_matches_log = projection.owners.len() == tree.len()
            && projection
                .owners
                .iter()
                .all(|(name, owner)| tree.owner_of(name) == Some(*owner));
        if !table_matches_log {
            return Err(SnapshotError::Inconsistent(
                "domain table does not match the registration events".into(),
            ));
        }

        let ledger = Ledger {
            native: snapshot.native_ledger.restore()?,
            stable: snapshot.stable_ledger.restore()?,
        };

        Ok(Self {
            tree,
            ledger,
            pricing: PricingEngine::new(snapshot.global_price, snapshot.rate),
            access: AccessControl::new(snapshot.administrator, snapshot.refresh_policy),
            log,
        })
    }
}
