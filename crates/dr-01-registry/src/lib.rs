//! # DR-01 Registry - Hierarchical Domain Registrar
//!
//! Sells dotted names for native coin or a pegged stablecoin, records who owns
//! them, and lets every owner withdraw what their domains earned.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Names are never removed or rebound | `domain/tree.rs` - `DomainTree::insert()` |
//! | A dotted name needs its immediate parent | `domain/tree.rs` - `check_registrable()` |
//! | Child price mutable only by the domain owner | `domain/access.rs` - `ensure_domain_owner()` |
//! | Global price mutable only by the administrator | `domain/access.rs` - `ensure_administrator()` |
//! | Proceeds credit the parent's owner (administrator for top-level) | `domain/state.rs` - `prepare_registration()` |
//! | Native and stablecoin books never mix | `domain/ledger.rs` - `Ledger` |
//! | Withdrawal zeroes the balance before paying | `service.rs` - `withdraw_in()` |
//! | `sum(balances) + paid_out == received` | `domain/ledger.rs` - `CurrencyBook::is_solvent()` |
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose | In-memory adapter |
//! |------|---------|-------------------|
//! | `PriceOracle` | Stablecoin-to-native rate | `FixedRateOracle` |
//! | `StablecoinToken` | Pull allowances, pay out | `InMemoryStablecoin` |
//! | `NativeVault` | Collect payments, pay out | `InMemoryNativeVault` |
//!
//! ## Error Taxonomy
//!
//! | Error | Raised when |
//! |-------|-------------|
//! | `AccessDenied` | Caller lacks the role |
//! | `DuplicateDomain` | Name already registered |
//! | `ParentDomainDoesNotExists` | Immediate parent missing |
//! | `NotEnoughFunds` | Payment below the native quote |
//! | `EmptyDomainName` / `InvalidDomainName` | Malformed name |
//!
//! ## Usage Example
//!
//! ```ignore
//! use dr_01_registry::prelude::*;
//!
//! let registry = create_test_service(admin, StableAmount::from(100u64))?;
//! registry.register_domain(bob, "shop", NativeAmount::from(100u64)).await?;
//! assert_eq!(registry.domain_owner("shop").await, Some(bob));
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities and value objects
    pub use crate::domain::entities::{Domain, RateRefreshPolicy, RegistryConfig};
    pub use crate::domain::value_objects::{ConversionRate, DomainName, Payment, Tender};

    // State, log and persistence
    pub use crate::domain::event_log::{EventLog, OwnershipProjection};
    pub use crate::domain::snapshot::{
        decode_snapshot, migrate_v1, RegistrySnapshot, SnapshotV1, SNAPSHOT_VERSION,
    };
    pub use crate::domain::state::RegistryState;

    // Ports
    pub use crate::ports::inbound::DomainRegistryApi;
    pub use crate::ports::outbound::{NativeVault, PriceOracle, StablecoinToken};

    // Adapters
    pub use crate::adapters::{FixedRateOracle, InMemoryNativeVault, InMemoryStablecoin};

    // Errors
    pub use crate::errors::{OracleError, RegistryError, SnapshotError, TokenError, VaultError};

    // Feed and service
    pub use crate::feed::RegistryFeed;
    pub use crate::service::{
        create_test_service, DomainRegistryService, InMemoryRegistry, ServiceStats,
        IN_MEMORY_REGISTRY_ACCOUNT,
    };

    // Shared types
    pub use shared_bus::{EventFilter, EventRecord, EventTopic, RegistryEvent};
    pub use shared_types::{Address, Currency, NativeAmount, StableAmount, U256};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Component name.
pub const COMPONENT_NAME: &str = "Domain Registry";

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = RegistryConfig::default();
        let _ = ConversionRate::parity();
        assert_eq!(COMPONENT_NAME, "Domain Registry");
    }
}
