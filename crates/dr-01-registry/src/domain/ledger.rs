//! # Earnings Ledger
//!
//! Per-owner balances kept separately for each currency. Each book also tracks
//! everything ever received and paid out, so that
//! `sum(balances) + paid_out == received` can be checked at any time.

use shared_types::{Address, Currency, NativeAmount, StableAmount, U256};
use std::collections::HashMap;

/// Amount types a book can hold.
pub trait LedgerAmount: Copy + Eq + Default + std::fmt::Debug {
    /// Currency of the amount.
    const CURRENCY: Currency;

    /// Checked addition.
    fn checked_add(self, other: Self) -> Option<Self>;

    /// Checked subtraction.
    fn checked_sub(self, other: Self) -> Option<Self>;

    /// Raw smallest-unit value.
    fn raw(self) -> U256;

    /// Wrap a raw value.
    fn from_raw(raw: U256) -> Self;
}

impl LedgerAmount for NativeAmount {
    const CURRENCY: Currency = Currency::Native;

    fn checked_add(self, other: Self) -> Option<Self> {
        NativeAmount::checked_add(self, other)
    }

    fn checked_sub(self, other: Self) -> Option<Self> {
        NativeAmount::checked_sub(self, other)
    }

    fn raw(self) -> U256 {
        NativeAmount::raw(self)
    }

    fn from_raw(raw: U256) -> Self {
        NativeAmount::new(raw)
    }
}

impl LedgerAmount for StableAmount {
    const CURRENCY: Currency = Currency::Stable;

    fn checked_add(self, other: Self) -> Option<Self> {
        StableAmount::checked_add(self, other)
    }

    fn checked_sub(self, other: Self) -> Option<Self> {
        StableAmount::checked_sub(self, other)
    }

    fn raw(self) -> U256 {
        StableAmount::raw(self)
    }

    fn from_raw(raw: U256) -> Self {
        StableAmount::new(raw)
    }
}

/// Balance book for one currency.
#[derive(Debug, Clone, Default)]
pub struct CurrencyBook<A: LedgerAmount> {
    balances: HashMap<Address, A>,
    received: A,
    paid_out: A,
}

impl<A: LedgerAmount> CurrencyBook<A> {
    /// Rebuild a book from persisted parts.
    pub(crate) fn from_parts(balances: HashMap<Address, A>, received: A, paid_out: A) -> Self {
        Self {
            balances,
            received,
            paid_out,
        }
    }

    /// Current balance, zero for unknown accounts.
    #[must_use]
    pub fn balance_of(&self, account: &Address) -> A {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Total ever credited.
    #[must_use]
    pub fn received(&self) -> A {
        self.received
    }

    /// Total ever paid out.
    #[must_use]
    pub fn paid_out(&self) -> A {
        self.paid_out
    }

    /// True if crediting `amount` to `account` would not overflow anything.
    #[must_use]
    pub fn can_credit(&self, account: &Address, amount: A) -> bool {
        self.balance_of(account).checked_add(amount).is_some()
            && self.received.checked_add(amount).is_some()
    }

    /// Credit an account. Returns `false` and changes nothing on overflow.
    pub fn credit(&mut self, account: Address, amount: A) -> bool {
        let (Some(balance), Some(received)) = (
            self.balance_of(&account).checked_add(amount),
            self.received.checked_add(amount),
        ) else {
            return false;
        };
        self.balances.insert(account, balance);
        self.received = received;
        true
    }

    /// Zero an account's balance and book it as paid out.
    pub fn take(&mut self, account: &Address) -> A {
        let amount = self.balances.remove(account).unwrap_or_default();
        // paid_out + balance never exceeds received, so this cannot overflow.
        self.paid_out = self.paid_out.checked_add(amount).unwrap_or(self.paid_out);
        amount
    }

    /// Undo a [`CurrencyBook::take`] whose payout failed.
    pub fn restore(&mut self, account: Address, amount: A) {
        if amount == A::default() {
            return;
        }
        self.paid_out = self.paid_out.checked_sub(amount).unwrap_or_default();
        let balance = self.balance_of(&account);
        self.balances
            .insert(account, balance.checked_add(amount).unwrap_or(balance));
    }

    /// `sum(balances) + paid_out == received`.
    #[must_use]
    pub fn is_solvent(&self) -> bool {
        let mut total = self.paid_out.raw();
        for balance in self.balances.values() {
            match total.checked_add(balance.raw()) {
                Some(t) => total = t,
                None => return false,
            }
        }
        total == self.received.raw()
    }

    /// Non-zero balances sorted by account.
    #[must_use]
    pub fn entries(&self) -> Vec<(Address, A)> {
        let mut entries: Vec<(Address, A)> = self
            .balances
            .iter()
            .filter(|(_, amount)| **amount != A::default())
            .map(|(account, amount)| (*account, *amount))
            .collect();
        entries.sort_by_key(|(account, _)| *account.as_bytes());
        entries
    }
}

/// Both currency books.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Native earnings.
    pub native: CurrencyBook<NativeAmount>,
    /// Stablecoin earnings.
    pub stable: CurrencyBook<StableAmount>,
}

impl Ledger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when both books balance.
    #[must_use]
    pub fn is_solvent(&self) -> bool {
        self.native.is_solvent() && self.stable.is_solvent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_take() {
        let mut book = CurrencyBook::<NativeAmount>::default();
        let alice = Address::repeat_byte(1);

        assert!(book.credit(alice, NativeAmount::from(6u64)));
        assert!(book.credit(alice, NativeAmount::from(4u64)));
        assert_eq!(book.balance_of(&alice), NativeAmount::from(10u64));

        assert_eq!(book.take(&alice), NativeAmount::from(10u64));
        assert_eq!(book.balance_of(&alice), NativeAmount::ZERO);
        assert_eq!(book.paid_out(), NativeAmount::from(10u64));
        assert!(book.is_solvent());
    }

    #[test]
    fn test_take_unknown_account_is_zero() {
        let mut book = CurrencyBook::<StableAmount>::default();
        assert_eq!(book.take(&Address::repeat_byte(9)), StableAmount::ZERO);
        assert!(book.is_solvent());
    }

    #[test]
    fn test_restore_after_failed_payout() {
        let mut book = CurrencyBook::<StableAmount>::default();
        let alice = Address::repeat_byte(1);
        book.credit(alice, StableAmount::from(5u64));

        let taken = book.take(&alice);
        book.restore(alice, taken);

        assert_eq!(book.balance_of(&alice), StableAmount::from(5u64));
        assert_eq!(book.paid_out(), StableAmount::ZERO);
        assert!(book.is_solvent());
    }

    #[test]
    fn test_overflow_credit_refused() {
        let mut book = CurrencyBook::<NativeAmount>::default();
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        assert!(book.credit(alice, NativeAmount::new(U256::MAX)));

        assert!(!book.can_credit(&alice, NativeAmount::from(1u64)));
        // Per-account balance fits, but the received total would overflow.
        assert!(!book.can_credit(&bob, NativeAmount::from(1u64)));
        assert!(!book.credit(bob, NativeAmount::from(1u64)));
        assert_eq!(book.balance_of(&bob), NativeAmount::ZERO);
        assert!(book.is_solvent());
    }

    #[test]
    fn test_currencies_are_independent() {
        let mut ledger = Ledger::new();
        let alice = Address::repeat_byte(1);
        ledger.native.credit(alice, NativeAmount::from(3u64));
        ledger.stable.credit(alice, StableAmount::from(7u64));

        assert_eq!(ledger.native.take(&alice), NativeAmount::from(3u64));
        assert_eq!(ledger.stable.balance_of(&alice), StableAmount::from(7u64));
        assert!(ledger.is_solvent());
    }

    #[test]
    fn test_entries_sorted_and_skip_zero() {
        let mut book = CurrencyBook::<StableAmount>::default();
        book.credit(Address::repeat_byte(2), StableAmount::from(2u64));
        book.credit(Address::repeat_byte(1), StableAmount::from(1u64));
        book.credit(Address::repeat_byte(3), StableAmount::from(3u64));
        book.take(&Address::repeat_byte(3));

        let accounts: Vec<Address> = book.entries().into_iter().map(|(a, _)| a).collect();
        assert_eq!(
            accounts,
            vec![Address::repeat_byte(1), Address::repeat_byte(2)]
        );
    }
}
