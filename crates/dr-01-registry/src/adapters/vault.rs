//! # In-Memory Native Vault
//!
//! Wallet balances plus the registry's custody account.

use crate::errors::VaultError;
use crate::ports::outbound::NativeVault;
use async_trait::async_trait;
use shared_types::{Address, NativeAmount, U256};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct VaultBooks {
    wallets: HashMap<Address, U256>,
    held: U256,
    paid_out: HashMap<Address, U256>,
    refusing: HashSet<Address>,
}

impl VaultBooks {
    fn wallet(&self, account: &Address) -> U256 {
        self.wallets.get(account).copied().unwrap_or_default()
    }
}

/// In-memory custody of native coin.
#[derive(Debug, Default)]
pub struct InMemoryNativeVault {
    books: Mutex<VaultBooks>,
}

impl InMemoryNativeVault {
    /// Empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `account` spendable coin.
    pub fn fund(&self, account: Address, amount: NativeAmount) {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = books.wallet(&account).saturating_add(amount.raw());
        books.wallets.insert(account, balance);
    }

    /// Put coin straight into custody, as when restoring a registry whose
    /// earlier proceeds already sit in the custody account.
    pub fn deposit_custody(&self, amount: NativeAmount) {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        books.held = books.held.saturating_add(amount.raw());
    }

    /// Make every payout to `account` fail, as a recipient that rejects
    /// incoming transfers would.
    pub fn refuse_payouts_to(&self, account: Address, refuse: bool) {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        if refuse {
            books.refusing.insert(account);
        } else {
            books.refusing.remove(&account);
        }
    }

    /// Spendable coin of `account`.
    #[must_use]
    pub fn wallet_balance(&self, account: &Address) -> NativeAmount {
        let books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        NativeAmount::new(books.wallet(account))
    }

    /// Coin in the registry's custody.
    #[must_use]
    pub fn held(&self) -> NativeAmount {
        NativeAmount::new(self.books.lock().unwrap_or_else(PoisonError::into_inner).held)
    }

    /// Total ever paid out to `account`.
    #[must_use]
    pub fn paid_out_to(&self, account: &Address) -> NativeAmount {
        let books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        NativeAmount::new(books.paid_out.get(account).copied().unwrap_or_default())
    }
}

#[async_trait]
impl NativeVault for InMemoryNativeVault {
    async fn collect(&self, from: Address, amount: NativeAmount) -> Result<(), VaultError> {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        let available = books.wallet(&from);
        let remaining = available
            .checked_sub(amount.raw())
            .ok_or(VaultError::InsufficientFunds {
                account: from,
                required: amount.raw(),
                available,
            })?;
        let held = books
            .held
            .checked_add(amount.raw())
            .ok_or_else(|| VaultError::TransferFailed {
                to: from,
                reason: "custody balance overflow".into(),
            })?;
        books.wallets.insert(from, remaining);
        books.held = held;
        Ok(())
    }

    async fn send(&self, to: Address, amount: NativeAmount) -> Result<(), VaultError> {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        if books.refusing.contains(&to) {
            return Err(VaultError::TransferFailed {
                to,
                reason: "recipient rejected the transfer".into(),
            });
        }
        let held = books
            .held
            .checked_sub(amount.raw())
            .ok_or_else(|| VaultError::TransferFailed {
                to,
                reason: format!("custody holds only {}", books.held),
            })?;
        books.held = held;
        let wallet = books.wallet(&to).saturating_add(amount.raw());
        books.wallets.insert(to, wallet);
        let paid = books
            .paid_out
            .get(&to)
            .copied()
            .unwrap_or_default()
            .saturating_add(amount.raw());
        books.paid_out.insert(to, paid);
        Ok(())
    }
}
