//! # Fixed Rate Oracle
//!
//! A settable feed: answers with whatever rate was last stored.

use crate::domain::value_objects::ConversionRate;
use crate::errors::OracleError;
use crate::ports::outbound::PriceOracle;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-memory oracle with a fixed, replaceable answer.
#[derive(Debug)]
pub struct FixedRateOracle {
    rate: RwLock<ConversionRate>,
    online: AtomicBool,
}

impl FixedRateOracle {
    /// Oracle answering `rate`.
    #[must_use]
    pub fn new(rate: ConversionRate) -> Self {
        Self {
            rate: RwLock::new(rate),
            online: AtomicBool::new(true),
        }
    }

    /// Replace the answer.
    pub fn set_rate(&self, rate: ConversionRate) {
        *self.rate.write().unwrap_or_else(PoisonError::into_inner) = rate;
    }

    /// Take the feed offline or bring it back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for FixedRateOracle {
    fn default() -> Self {
        Self::new(ConversionRate::parity())
    }
}

#[async_trait]
impl PriceOracle for FixedRateOracle {
    async fn latest_rate(&self) -> Result<ConversionRate, OracleError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("feed offline".into()));
        }
        let rate = *self.rate.read().unwrap_or_else(PoisonError::into_inner);
        if rate.is_usable() {
            Ok(rate)
        } else {
            Err(OracleError::InvalidRate(rate.raw()))
        }
    }
}
