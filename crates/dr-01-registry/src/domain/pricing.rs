//! # Pricing Engine
//!
//! Prices are stored in stablecoin units. Native quotes are derived from the
//! current conversion rate at the moment they are requested.

use crate::domain::entities::Domain;
use crate::domain::value_objects::{ConversionRate, Payment};
use crate::errors::{OracleError, RegistryError};
use shared_types::{Currency, NativeAmount, StableAmount};

/// Global default price plus the current conversion rate.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    global_price: StableAmount,
    rate: ConversionRate,
}

impl PricingEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(global_price: StableAmount, rate: ConversionRate) -> Self {
        Self { global_price, rate }
    }

    /// Price of a top-level name, and the child price new domains start with.
    #[must_use]
    pub fn global_price(&self) -> StableAmount {
        self.global_price
    }

    /// Replace the global price, returning the old one.
    pub fn set_global_price(&mut self, price: StableAmount) -> StableAmount {
        std::mem::replace(&mut self.global_price, price)
    }

    /// The current rate.
    #[must_use]
    pub fn rate(&self) -> ConversionRate {
        self.rate
    }

    /// Replace the rate.
    ///
    /// # Errors
    ///
    /// `Oracle(InvalidRate)` for a zero rate; the previous rate is kept.
    pub fn set_rate(&mut self, rate: ConversionRate) -> Result<ConversionRate, RegistryError> {
        if !rate.is_usable() {
            return Err(OracleError::InvalidRate(rate.raw()).into());
        }
        Ok(std::mem::replace(&mut self.rate, rate))
    }

    /// Stable price to register under `parent` (`None` for top-level).
    #[must_use]
    pub fn registration_price(&self, parent: Option<&Domain>) -> StableAmount {
        parent.map_or(self.global_price, |p| p.child_price)
    }

    /// Native equivalent of a stable price at the current rate.
    ///
    /// # Errors
    ///
    /// `ArithmeticOverflow` if the conversion leaves 256 bits.
    pub fn to_native(&self, stable: StableAmount) -> Result<NativeAmount, RegistryError> {
        self.rate
            .to_native(stable)
            .ok_or(RegistryError::ArithmeticOverflow {
                context: "stable to native conversion",
            })
    }

    /// Price in the requested currency.
    ///
    /// # Errors
    ///
    /// `ArithmeticOverflow` on a native conversion overflow.
    pub fn quote(&self, stable: StableAmount, currency: Currency) -> Result<Payment, RegistryError> {
        match currency {
            Currency::Native => self.to_native(stable).map(Payment::Native),
            Currency::Stable => Ok(Payment::Stable(stable)),
        }
    }
}
