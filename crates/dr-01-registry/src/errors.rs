//! # Error Types
//!
//! All error types for registry operations and the adapters behind its ports.

use shared_types::{Address, Currency, NativeAmount, U256};
use thiserror::Error;

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors surfaced by registry operations.
///
/// Every variant is raised before any state is touched, so a failed
/// operation leaves the registry exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Caller lacks the role required for the operation.
    #[error("access denied for {caller}")]
    AccessDenied {
        /// The rejected caller.
        caller: Address,
    },

    /// The name is already registered.
    #[error("duplicate domain: {0}")]
    DuplicateDomain(String),

    /// The immediate parent of a dotted name is not registered.
    #[error("parent domain does not exist: {parent} (required by {domain})")]
    ParentDomainDoesNotExists {
        /// Name being registered.
        domain: String,
        /// Missing parent.
        parent: String,
    },

    /// Payment below the computed requirement.
    #[error("not enough funds: required {required}, provided {provided}")]
    NotEnoughFunds {
        /// Minimum native payment.
        required: NativeAmount,
        /// What the caller attached.
        provided: NativeAmount,
    },

    /// Registration or lookup with an empty name.
    #[error("domain name is empty")]
    EmptyDomainName,

    /// A dotted name with an empty label (`a..b`, `.a`, `a.`).
    #[error("invalid domain name: {0:?}")]
    InvalidDomainName(String),

    /// Price query for a name that is not registered.
    #[error("domain not found: {0}")]
    DomainNotFound(String),

    /// A balance, total or price conversion left the 256-bit range.
    #[error("arithmetic overflow in {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: &'static str,
    },

    /// The registry configuration is unusable.
    #[error("invalid registry configuration: {0}")]
    InvalidConfig(String),

    /// The price oracle could not supply a rate.
    #[error("price oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// The stablecoin contract rejected a transfer.
    #[error("stablecoin error: {0}")]
    Stablecoin(#[from] TokenError),

    /// The native vault rejected a collection or payout.
    #[error("native vault error: {0}")]
    Vault(#[from] VaultError),
}

impl RegistryError {
    /// Short stable identifier, used in metrics labels and HTTP bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "AccessDenied",
            Self::DuplicateDomain(_) => "DuplicateDomain",
            Self::ParentDomainDoesNotExists { .. } => "ParentDomainDoesNotExists",
            Self::NotEnoughFunds { .. } => "NotEnoughFunds",
            Self::EmptyDomainName => "EmptyDomainName",
            Self::InvalidDomainName(_) => "InvalidDomainName",
            Self::DomainNotFound(_) => "DomainNotFound",
            Self::ArithmeticOverflow { .. } => "ArithmeticOverflow",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Oracle(_) => "OracleError",
            Self::Stablecoin(_) => "StablecoinError",
            Self::Vault(_) => "VaultError",
        }
    }
}

// =============================================================================
// PORT ERRORS
// =============================================================================

/// Errors from the external conversion-rate feed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The feed answered with a zero rate.
    #[error("oracle returned an unusable rate: {0}")]
    InvalidRate(U256),

    /// The feed could not be reached.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the stablecoin token contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Allowance granted to the registry is below the amount pulled.
    #[error("insufficient allowance for {owner}: required {required}, approved {approved}")]
    InsufficientAllowance {
        /// Token holder.
        owner: Address,
        /// Amount requested.
        required: U256,
        /// Amount approved.
        approved: U256,
    },

    /// Holder balance below the amount moved.
    #[error("insufficient token balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        /// Account debited.
        account: Address,
        /// Amount requested.
        required: U256,
        /// Amount available.
        available: U256,
    },

    /// Any other token-side failure.
    #[error("token transfer failed: {0}")]
    TransferFailed(String),
}

/// Errors from moving native coin in or out of the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Payer wallet cannot cover the attached payment.
    #[error("insufficient native funds for {account}: required {required}, available {available}")]
    InsufficientFunds {
        /// Account debited.
        account: Address,
        /// Amount requested.
        required: U256,
        /// Amount available.
        available: U256,
    },

    /// The recipient refused or the transfer failed.
    #[error("native transfer to {to} failed: {reason}")]
    TransferFailed {
        /// Recipient.
        to: Address,
        /// Cause.
        reason: String,
    },
}

// =============================================================================
// SNAPSHOT ERRORS
// =============================================================================

/// Errors when loading or migrating a persisted registry state.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Malformed JSON or wrong shape.
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Snapshot schema version is not known.
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u64),

    /// The snapshot violates a registry invariant.
    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),

    /// Ledger totals do not cover balances for a currency.
    #[error("snapshot ledger for {0} is insolvent")]
    Insolvent(Currency),
}
