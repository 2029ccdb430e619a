//! # Core Domain Entities
//!
//! Account identifiers, currencies and the two amount types used by every
//! crate in the workspace.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`
//! - **Value**: `Currency`, `NativeAmount`, `StableAmount`
//!
//! Native and stable amounts are deliberately distinct types. The only place
//! one is turned into the other is the registry's pricing engine.

use crate::errors::{AddressParseError, CurrencyParseError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// Decimals of the native coin (wei per ether).
pub const NATIVE_DECIMALS: u32 = 18;

/// Decimals of the stablecoin (USDC smallest units per whole token).
pub const STABLE_DECIMALS: u32 = 6;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 20-byte Ethereum-style account address.
///
/// Serialized as a `0x`-prefixed lowercase hex string. Parsing accepts either
/// case, with or without the prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, used as the "not found" sentinel by external callers.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose every byte is `byte`. Handy for fixtures.
    #[must_use]
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Abbreviated form for log lines (`0x1234abcd...eeff`).
    #[must_use]
    pub fn short(&self) -> String {
        format!(
            "0x{}...{}",
            hex::encode(&self.0[..4]),
            hex::encode(&self.0[18..])
        )
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 40 {
            return Err(AddressParseError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// CLUSTER B: VALUE
// =============================================================================

/// The two currencies the registry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// The host chain's base coin, counted in wei.
    Native,
    /// The pegged stablecoin, counted in its smallest unit.
    Stable,
}

impl Currency {
    /// Ticker used on the external interface (`eth` / `usdc`).
    #[must_use]
    pub const fn ticker(self) -> &'static str {
        match self {
            Self::Native => "eth",
            Self::Stable => "usdc",
        }
    }

    /// Number of decimals of the currency's smallest unit.
    #[must_use]
    pub const fn decimals(self) -> u32 {
        match self {
            Self::Native => NATIVE_DECIMALS,
            Self::Stable => STABLE_DECIMALS,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

impl FromStr for Currency {
    type Err = CurrencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eth" | "native" => Ok(Self::Native),
            "usdc" | "stable" => Ok(Self::Stable),
            _ => Err(CurrencyParseError(s.to_string())),
        }
    }
}

macro_rules! amount_type {
    ($(#[$meta:meta])* $name:ident, $currency:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub U256);

        impl $name {
            /// The zero amount.
            pub const ZERO: Self = Self(U256::zero());

            /// Wraps a raw smallest-unit value.
            #[must_use]
            pub const fn new(raw: U256) -> Self {
                Self(raw)
            }

            /// The raw smallest-unit value.
            #[must_use]
            pub const fn raw(self) -> U256 {
                self.0
            }

            /// Currency this amount is denominated in.
            #[must_use]
            pub const fn currency(self) -> Currency {
                $currency
            }

            /// Returns true if the amount is zero.
            #[must_use]
            pub fn is_zero(self) -> bool {
                self.0.is_zero()
            }

            /// Checked addition. `None` on overflow.
            #[must_use]
            pub fn checked_add(self, other: Self) -> Option<Self> {
                self.0.checked_add(other.0).map(Self)
            }

            /// Checked subtraction. `None` on underflow.
            #[must_use]
            pub fn checked_sub(self, other: Self) -> Option<Self> {
                self.0.checked_sub(other.0).map(Self)
            }

            /// Renders the amount in whole units, e.g. `0.000000000000000100`.
            #[must_use]
            pub fn format_units(self) -> String {
                format_units(self.0, $currency.decimals())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} {}", self.0, $currency.ticker())
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(U256::from(raw))
            }
        }

        impl From<u128> for $name {
            fn from(raw: u128) -> Self {
                Self(U256::from(raw))
            }
        }
    };
}

amount_type!(
    /// An amount of the native coin, in wei.
    NativeAmount,
    Currency::Native
);

amount_type!(
    /// An amount of the stablecoin, in its smallest unit.
    StableAmount,
    Currency::Stable
);

/// Formats a raw integer as a fixed-point decimal with `decimals` places.
fn format_units(raw: U256, decimals: u32) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let split = padded.len() - decimals;
    format!("{}.{}", &padded[..split], &padded[split..])
}
