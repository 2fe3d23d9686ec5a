//! Account (ledger entry) model and operations.
//!
//! Maintains the invariant: `balance >= 0` at all times.

use crate::error::{LedgerError, Result};
use crate::holder::{AccountId, Holder};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One account's money and identity.
///
/// # Invariants
///
/// - `balance >= 0` after every operation; there is no overdraft
/// - `id` and `created_at` never change after construction
/// - A rejected operation leaves the account untouched
///
/// The account cannot see its siblings, so holder tax-id uniqueness is the
/// job of the [`AccountDirectory`](crate::AccountDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    id: AccountId,
    balance: Money,
    holder: Holder,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new account with a zero balance, stamped with the current time.
    pub fn open(id: AccountId, holder: Holder) -> Self {
        Account {
            id,
            balance: Money::ZERO,
            holder,
            created_at: Utc::now(),
        }
    }

    /// Rebuilds an account from a stored record.
    ///
    /// Fails with `InvalidAmount` if the stored balance is negative.
    pub fn restore(
        id: AccountId,
        holder: Holder,
        balance: Money,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if balance.is_negative() {
            return Err(LedgerError::InvalidAmount(balance));
        }
        Ok(Account {
            id,
            balance,
            holder,
            created_at,
        })
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn holder(&self) -> &Holder {
        &self.holder
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Credits `amount` to the balance.
    ///
    /// Fails with `InvalidAmount` unless `amount > 0`.
    pub fn deposit(&mut self, amount: Money) -> Result<()> {
        ensure_positive(amount)?;
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        Ok(())
    }

    /// Debits `amount` from the balance.
    ///
    /// Fails with `InvalidAmount` unless `amount > 0`, and with
    /// `InsufficientFunds` if `amount` exceeds the balance.
    pub fn withdraw(&mut self, amount: Money) -> Result<()> {
        ensure_positive(amount)?;
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        Ok(())
    }

    /// Replaces the holder wholesale.
    pub fn rename_holder(&mut self, holder: Holder) {
        self.holder = holder;
    }

    /// Verifies the invariant: `balance >= 0`.
    #[cfg(debug_assertions)]
    pub fn check_invariant(&self) -> bool {
        !self.balance.is_negative()
    }
}

fn ensure_positive(amount: Money) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}
