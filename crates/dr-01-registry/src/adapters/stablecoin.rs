//! # In-Memory Stablecoin
//!
//! An ERC-20 style token with balances and allowances toward the registry.

use crate::errors::TokenError;
use crate::ports::outbound::StablecoinToken;
use async_trait::async_trait;
use shared_types::{Address, StableAmount, U256};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct TokenBooks {
    balances: HashMap<Address, U256>,
    /// Allowance each holder granted the registry.
    allowances: HashMap<Address, U256>,
}

impl TokenBooks {
    fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn move_funds(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let available = self.balance(&from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                account: from,
                required: amount,
                available,
            })?;
        let credited = self
            .balance(&to)
            .checked_add(amount)
            .ok_or_else(|| TokenError::TransferFailed(format!("balance overflow for {to}")))?;
        self.balances.insert(from, remaining);
        self.balances.insert(to, credited);
        Ok(())
    }
}

/// In-memory stablecoin held on behalf of one registry account.
#[derive(Debug)]
pub struct InMemoryStablecoin {
    registry: Address,
    books: Mutex<TokenBooks>,
}

impl InMemoryStablecoin {
    /// Token whose `transfer_from`/`transfer` act for `registry`.
    #[must_use]
    pub fn new(registry: Address) -> Self {
        Self {
            registry,
            books: Mutex::new(TokenBooks::default()),
        }
    }

    /// The registry's own account.
    #[must_use]
    pub fn registry(&self) -> Address {
        self.registry
    }

    /// Create tokens for `account`.
    pub fn mint(&self, account: Address, amount: StableAmount) {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = books.balance(&account).saturating_add(amount.raw());
        books.balances.insert(account, balance);
    }

    /// `owner` lets the registry pull up to `amount`.
    pub fn approve(&self, owner: Address, amount: StableAmount) {
        self.books
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allowances
            .insert(owner, amount.raw());
    }

    /// Token balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: &Address) -> StableAmount {
        let books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        StableAmount::new(books.balance(account))
    }

    /// Remaining allowance `owner` granted the registry.
    #[must_use]
    pub fn allowance(&self, owner: &Address) -> StableAmount {
        let books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        StableAmount::new(books.allowances.get(owner).copied().unwrap_or_default())
    }
}

#[async_trait]
impl StablecoinToken for InMemoryStablecoin {
    async fn transfer_from(&self, owner: Address, amount: StableAmount) -> Result<(), TokenError> {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        let approved = books.allowances.get(&owner).copied().unwrap_or_default();
        let remaining = approved
            .checked_sub(amount.raw())
            .ok_or(TokenError::InsufficientAllowance {
                owner,
                required: amount.raw(),
                approved,
            })?;
        books.move_funds(owner, self.registry, amount.raw())?;
        books.allowances.insert(owner, remaining);
        Ok(())
    }

    async fn transfer(&self, to: Address, amount: StableAmount) -> Result<(), TokenError> {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        books.move_funds(self.registry, to, amount.raw())
    }
}
