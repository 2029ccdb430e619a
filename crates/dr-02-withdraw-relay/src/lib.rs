//! # DR-02 Withdraw Relay
//!
//! HTTP front for custodial withdrawals: the relay holds a small set of
//! account keys and withdraws on their behalf when asked over HTTP.
//!
//! ## Endpoints
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /withdraw/:account?currency=eth\|usdc` | Withdraw the account's whole balance |
//! | `GET /health` | Liveness |
//! | `GET /metrics` | Prometheus scrape |
//!
//! ## Status Codes
//!
//! | Status | When |
//! |--------|------|
//! | 200 | Payout committed; body is a `WithdrawReceipt` |
//! | 400 | Account outside the key set, or currency not `eth`/`usdc` |
//! | 500 | Registry failure; body is `{"error": message}` |
//!
//! ## Usage Example
//!
//! ```ignore
//! use dr_02_withdraw_relay::prelude::*;
//!
//! let relay = WithdrawRelay::new(RelayConfig::with_accounts([alice]), registry)?;
//! relay.start(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod domain;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::domain::config::{
        parse_currency, ConfigError, KeySet, RelayConfig, DEFAULT_RELAY_PORT,
    };
    pub use crate::domain::error::RelayError;
    pub use crate::service::{RelayState, WithdrawReceipt, WithdrawRelay};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Component name.
pub const COMPONENT_NAME: &str = "Withdraw Relay";
