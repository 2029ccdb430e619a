//! # Domain Tree
//!
//! The set of registered names. Every dotted name's immediate parent is
//! registered before it, and a registered name is never removed or rebound.

use crate::domain::entities::Domain;
use crate::domain::value_objects::DomainName;
use crate::errors::RegistryError;
use shared_types::{Address, StableAmount};
use std::collections::HashMap;

/// Registered domains keyed by full name.
#[derive(Debug, Clone, Default)]
pub struct DomainTree {
    domains: HashMap<String, Domain>,
}

impl DomainTree {
    /// Empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a name can be registered and return its parent domain, if any.
    ///
    /// # Errors
    ///
    /// - `DuplicateDomain` if the name is taken
    /// - `ParentDomainDoesNotExists` if a dotted name's parent is missing
    pub fn check_registrable(&self, name: &DomainName) -> Result<Option<&Domain>, RegistryError> {
        if self.domains.contains_key(name.as_str()) {
            return Err(RegistryError::DuplicateDomain(name.to_string()));
        }
        match name.parent() {
            None => Ok(None),
            Some(parent) => match self.domains.get(parent) {
                Some(domain) => Ok(Some(domain)),
                None => Err(RegistryError::ParentDomainDoesNotExists {
                    domain: name.to_string(),
                    parent: parent.to_string(),
                }),
            },
        }
    }

    /// Insert a domain after re-checking the hierarchy rules.
    ///
    /// # Errors
    ///
    /// Same as [`DomainTree::check_registrable`].
    pub fn insert(&mut self, domain: Domain) -> Result<(), RegistryError> {
        self.check_registrable(&domain.name)?;
        self.domains.insert(domain.name.to_string(), domain);
        Ok(())
    }

    /// Look up a domain.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Domain> {
        self.domains.get(name)
    }

    /// Owner of a domain.
    #[must_use]
    pub fn owner_of(&self, name: &str) -> Option<Address> {
        self.domains.get(name).map(|d| d.owner)
    }

    /// True if the name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.domains.contains_key(name)
    }

    /// Replace a domain's child price, returning the previous one.
    ///
    /// # Errors
    ///
    /// `DomainNotFound` if the name is not registered.
    pub fn set_child_price(
        &mut self,
        name: &str,
        price: StableAmount,
    ) -> Result<StableAmount, RegistryError> {
        let domain = self
            .domains
            .get_mut(name)
            .ok_or_else(|| RegistryError::DomainNotFound(name.to_string()))?;
        Ok(std::mem::replace(&mut domain.child_price, price))
    }

    /// Number of registered domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// All domains, parents before children.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Domain> {
        let mut all: Vec<&Domain> = self.domains.values().collect();
        all.sort_by(|a, b| {
            a.name
                .depth()
                .cmp(&b.name.depth())
                .then_with(|| a.name.cmp(&b.name))
        });
        all
    }
}
