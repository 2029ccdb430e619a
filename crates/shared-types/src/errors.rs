//! # Error Types
//!
//! Parsing errors for the shared identity and currency types.

use thiserror::Error;

/// Errors raised when parsing an [`Address`](crate::Address) from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// Wrong number of hex digits (40 expected).
    #[error("invalid address length: expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    /// Non-hex characters in the input.
    #[error("invalid address hex: {0}")]
    InvalidHex(String),
}

/// Raised when a currency ticker is not `eth` or `usdc`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported currency: {0:?}")]
pub struct CurrencyParseError(pub String);
