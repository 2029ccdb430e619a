//! # Value Objects
//!
//! Validated names, the conversion rate and the two-currency payment types.

use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use shared_types::{Currency, NativeAmount, StableAmount, U256, STABLE_DECIMALS};
use std::fmt;

// =============================================================================
// DOMAIN NAME
// =============================================================================

/// A validated, dotted domain name.
///
/// The leftmost label is the most specific. The name with the leftmost label
/// and its dot removed is the immediate parent (`a.b.c` has parent `b.c`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Label separator.
    pub const SEPARATOR: char = '.';

    /// Validate a raw name.
    ///
    /// # Errors
    ///
    /// - `EmptyDomainName` for `""`
    /// - `InvalidDomainName` when any label is empty
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        if raw.is_empty() {
            return Err(RegistryError::EmptyDomainName);
        }
        if raw.split(Self::SEPARATOR).any(str::is_empty) {
            return Err(RegistryError::InvalidDomainName(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// The immediate parent, or `None` for a top-level name.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.0
            .split_once(Self::SEPARATOR)
            .map(|(_, parent)| parent)
    }

    /// True when the name has no dot.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent().is_none()
    }

    /// Number of labels.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.split(Self::SEPARATOR).count()
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DomainName {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

// =============================================================================
// CONVERSION RATE
// =============================================================================

/// Native smallest units charged per one whole stablecoin.
///
/// A native quote for `s` stable units is `ceil(s * rate / 10^6)`, so a
/// registrant can never underpay by truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionRate(U256);

impl ConversionRate {
    /// Create from the raw native-per-whole-stablecoin figure.
    #[must_use]
    pub const fn new(native_per_stable_token: U256) -> Self {
        Self(native_per_stable_token)
    }

    /// Rate under which one stable unit costs exactly one native unit.
    #[must_use]
    pub fn parity() -> Self {
        Self(Self::stable_scale())
    }

    /// The raw figure.
    #[must_use]
    pub const fn raw(self) -> U256 {
        self.0
    }

    /// A zero rate would make every registration free.
    #[must_use]
    pub fn is_usable(self) -> bool {
        !self.0.is_zero()
    }

    /// Convert a stable price to the native amount to charge, rounding up.
    ///
    /// Returns `None` on 256-bit overflow.
    #[must_use]
    pub fn to_native(self, stable: StableAmount) -> Option<NativeAmount> {
        let product = stable.raw().checked_mul(self.0)?;
        let (quotient, remainder) = product.div_mod(Self::stable_scale());
        let native = if remainder.is_zero() {
            quotient
        } else {
            quotient.checked_add(U256::one())?
        };
        Some(NativeAmount::new(native))
    }

    fn stable_scale() -> U256 {
        U256::exp10(STABLE_DECIMALS as usize)
    }
}

impl Default for ConversionRate {
    fn default() -> Self {
        Self::parity()
    }
}

impl fmt::Display for ConversionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei/usdc", self.0)
    }
}

// =============================================================================
// PAYMENTS
// =============================================================================

/// An amount tagged with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "currency", content = "amount", rename_all = "lowercase")]
pub enum Payment {
    /// Native coin.
    Native(NativeAmount),
    /// Stablecoin.
    Stable(StableAmount),
}

impl Payment {
    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        match currency {
            Currency::Native => Self::Native(NativeAmount::ZERO),
            Currency::Stable => Self::Stable(StableAmount::ZERO),
        }
    }

    /// Which currency this is.
    #[must_use]
    pub fn currency(self) -> Currency {
        match self {
            Self::Native(_) => Currency::Native,
            Self::Stable(_) => Currency::Stable,
        }
    }

    /// Raw smallest-unit figure.
    #[must_use]
    pub fn raw(self) -> U256 {
        match self {
            Self::Native(amount) => amount.raw(),
            Self::Stable(amount) => amount.raw(),
        }
    }

    /// True for a zero amount.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.raw().is_zero()
    }

    /// The native amount, if this is one.
    #[must_use]
    pub fn native(self) -> Option<NativeAmount> {
        match self {
            Self::Native(amount) => Some(amount),
            Self::Stable(_) => None,
        }
    }

    /// The stable amount, if this is one.
    #[must_use]
    pub fn stable(self) -> Option<StableAmount> {
        match self {
            Self::Stable(amount) => Some(amount),
            Self::Native(_) => None,
        }
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(amount) => write!(f, "{amount}"),
            Self::Stable(amount) => write!(f, "{amount}"),
        }
    }
}

/// How a registrant pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tender {
    /// Native coin attached to the call; any excess over the price is kept.
    Native(NativeAmount),
    /// Stablecoin pulled from the registrant's allowance; exactly the price.
    Stable,
}

impl Tender {
    /// Currency of the tender.
    #[must_use]
    pub fn currency(self) -> Currency {
        match self {
            Self::Native(_) => Currency::Native,
            Self::Stable => Currency::Stable,
        }
    }
}
