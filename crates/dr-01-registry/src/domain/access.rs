//! # Access Control
//!
//! One administrator for the global price; each domain owner for that
//! domain's child price.

use crate::domain::entities::{Domain, RateRefreshPolicy};
use crate::domain::tree::DomainTree;
use crate::errors::RegistryError;
use shared_types::Address;

/// Role checks.
#[derive(Debug, Clone)]
pub struct AccessControl {
    administrator: Address,
    refresh_policy: RateRefreshPolicy,
}

impl AccessControl {
    /// Create with the fixed administrator.
    #[must_use]
    pub fn new(administrator: Address, refresh_policy: RateRefreshPolicy) -> Self {
        Self {
            administrator,
            refresh_policy,
        }
    }

    /// The administrator.
    #[must_use]
    pub fn administrator(&self) -> Address {
        self.administrator
    }

    /// Rate refresh policy.
    #[must_use]
    pub fn refresh_policy(&self) -> RateRefreshPolicy {
        self.refresh_policy
    }

    /// # Errors
    ///
    /// `AccessDenied` unless `caller` is the administrator.
    pub fn ensure_administrator(&self, caller: Address) -> Result<(), RegistryError> {
        if caller == self.administrator {
            Ok(())
        } else {
            Err(RegistryError::AccessDenied { caller })
        }
    }

    /// Resolve a domain the caller owns.
    ///
    /// An unregistered name is reported as `AccessDenied`: nobody owns it.
    ///
    /// # Errors
    ///
    /// `AccessDenied` unless `caller` owns `name`.
    pub fn ensure_domain_owner<'t>(
        &self,
        tree: &'t DomainTree,
        name: &str,
        caller: Address,
    ) -> Result<&'t Domain, RegistryError> {
        match tree.get(name) {
            Some(domain) if domain.owner == caller => Ok(domain),
            _ => Err(RegistryError::AccessDenied { caller }),
        }
    }

    /// # Errors
    ///
    /// `AccessDenied` when the policy restricts refreshes to the
    /// administrator and `caller` is someone else.
    pub fn ensure_rate_refresher(&self, caller: Address) -> Result<(), RegistryError> {
        match self.refresh_policy {
            RateRefreshPolicy::Anyone => Ok(()),
            RateRefreshPolicy::AdministratorOnly => self.ensure_administrator(caller),
        }
    }
}
