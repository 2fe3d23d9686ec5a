//! Account directory: identity management and uniqueness enforcement.
//!
//! Every operation either fully applies (account mutated and persisted) or
//! is fully rejected. Read-modify-write on one account runs under that
//! account's mutex, so two withdrawals can never both pass the sufficiency
//! check against the same balance. Operations on different accounts only
//! meet on a shard of the lock table while fetching their mutex.

use crate::account::Account;
use crate::error::{LedgerError, Result};
use crate::holder::{AccountId, Holder, TaxId};
use crate::money::Money;
use crate::store::AccountStore;
use dashmap::DashMap;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The identity-keyed collection of accounts.
///
/// # Locking
///
/// - One mutex per [`AccountId`] guards each balance read-modify-write.
/// - An identity mutex serializes the operations that check holder tax-id
///   uniqueness across accounts (`create`, `rename_holder`).
///
/// The identity mutex is always taken before an account mutex. An account
/// mutex is evicted from the lock table once the table holds the only
/// reference to it; the check runs under the shard lock that also guards
/// handing it out, so there is never more than one live mutex per id.
pub struct AccountDirectory<S> {
    store: S,
    account_locks: DashMap<AccountId, Arc<Mutex<()>>>,
    identity_lock: Mutex<()>,
}

impl<S: AccountStore> AccountDirectory<S> {
    pub fn new(store: S) -> Self {
        AccountDirectory {
            store,
            account_locks: DashMap::new(),
            identity_lock: Mutex::new(()),
        }
    }

    /// Opens a new account.
    ///
    /// A positive `initial_balance` is applied as a first deposit; a negative
    /// one fails with `InvalidAmount` and nothing is stored.
    ///
    /// # Errors
    ///
    /// - `DuplicateId` if `id` is taken
    /// - `DuplicateHolder` if another account has the same holder tax id
    /// - `InvalidAmount` if `initial_balance < 0`
    pub fn create(&self, id: AccountId, holder: Holder, initial_balance: Money) -> Result<Account> {
        let _identity = lock(&self.identity_lock);
        self.with_account_lock(id, || {
            if self.store.exists_by_id(id)? {
                return Err(LedgerError::DuplicateId(id));
            }
            if let Some(owner) = self.store.find_by_holder_tax_id(holder.tax_id())? {
                return Err(LedgerError::DuplicateHolder {
                    tax_id: holder.tax_id().clone(),
                    owner: owner.id(),
                });
            }

            if initial_balance.is_negative() {
                return Err(LedgerError::InvalidAmount(initial_balance));
            }
            let mut account = Account::open(id, holder);
            if initial_balance.is_positive() {
                account.deposit(initial_balance)?;
            }

            self.store.put(&account)?;
            debug!("Created account {} with balance {}", id, account.balance());
            Ok(account)
        })
    }

    /// Looks up an account. Absence is not an error at this layer.
    pub fn find(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.store.get(id)?)
    }

    /// Snapshot of all accounts in insertion order.
    ///
    /// Later mutations of the directory do not affect a returned snapshot.
    pub fn list(&self) -> Result<Vec<Account>> {
        Ok(self.store.list_all()?)
    }

    /// Balance inquiry.
    pub fn balance(&self, id: AccountId) -> Result<Money> {
        self.find(id)?
            .map(|account| account.balance())
            .ok_or(LedgerError::NotFound(id))
    }

    /// Credits `amount` to account `id` and persists it.
    pub fn deposit(&self, id: AccountId, amount: Money) -> Result<Account> {
        let account = self.update(id, |account| account.deposit(amount))?;
        debug!("Deposited {} to account {}", amount, id);
        Ok(account)
    }

    /// Debits `amount` from account `id` and persists it.
    pub fn withdraw(&self, id: AccountId, amount: Money) -> Result<Account> {
        let account = self.update(id, |account| account.withdraw(amount))?;
        debug!("Withdrew {} from account {}", amount, id);
        Ok(account)
    }

    /// Replaces the holder of account `id`.
    ///
    /// Keeping the same tax id (a name-only change) is allowed; taking a tax
    /// id owned by a different account fails with `DuplicateHolder`.
    pub fn rename_holder(&self, id: AccountId, holder: Holder) -> Result<Account> {
        let _identity = lock(&self.identity_lock);

        if let Some(owner) = self.store.find_by_holder_tax_id(holder.tax_id())? {
            if owner.id() != id {
                // Report a missing target before a collision with someone else
                if !self.store.exists_by_id(id)? {
                    return Err(LedgerError::NotFound(id));
                }
                return Err(LedgerError::DuplicateHolder {
                    tax_id: holder.tax_id().clone(),
                    owner: owner.id(),
                });
            }
        }

        let account = self.update(id, |account| {
            account.rename_holder(holder);
            Ok(())
        })?;
        debug!("Renamed holder of account {}", id);
        Ok(account)
    }

    /// Deletes an empty account.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `id` is absent
    /// - `NonZeroBalance` if the account still holds money
    pub fn remove(&self, id: AccountId) -> Result<()> {
        self.with_account_lock(id, || {
            let account = self.store.get(id)?.ok_or(LedgerError::NotFound(id))?;
            if !account.balance().is_zero() {
                return Err(LedgerError::NonZeroBalance {
                    id,
                    balance: account.balance(),
                });
            }

            self.store.delete(id)?;
            debug!("Removed account {}", id);
            Ok(())
        })
    }

    /// Number of accounts with a balance greater than zero.
    pub fn count_with_positive_balance(&self) -> Result<usize> {
        Ok(self
            .list()?
            .iter()
            .filter(|account| account.balance().is_positive())
            .count())
    }

    /// Sum of all balances.
    ///
    /// Fails with `TotalOverflow` when the sum does not fit in a [`Money`].
    pub fn total_balance(&self) -> Result<Money> {
        let balances = self.list()?.into_iter().map(|account| account.balance());
        Money::checked_sum(balances).ok_or(LedgerError::TotalOverflow)
    }

    /// Account owned by the holder with `tax_id`, if any.
    pub fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Account>> {
        Ok(self.store.find_by_holder_tax_id(tax_id)?)
    }

    /// Accounts whose holder name contains `fragment`, ignoring case.
    pub fn search_by_holder_name(&self, fragment: &str) -> Result<Vec<Account>> {
        let needle = fragment.trim().to_lowercase();
        Ok(self
            .list()?
            .into_iter()
            .filter(|account| account.holder().name().to_lowercase().contains(&needle))
            .collect())
    }

    /// Accounts with `min <= balance <= max`.
    pub fn with_balance_between(&self, min: Money, max: Money) -> Result<Vec<Account>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|account| (min..=max).contains(&account.balance()))
            .collect())
    }

    /// Loads, mutates and persists one account under its mutex.
    ///
    /// The store is written only if `op` succeeds, so a rejected operation
    /// leaves the stored account untouched.
    fn update<F>(&self, id: AccountId, op: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        self.with_account_lock(id, || {
            let mut account = self.store.get(id)?.ok_or(LedgerError::NotFound(id))?;
            op(&mut account)?;
            self.store.put(&account)?;
            Ok(account)
        })
    }

    /// Runs `critical` holding the mutex of account `id`.
    ///
    /// The mutex is dropped from the lock table afterwards unless another
    /// caller still holds or waits on it.
    fn with_account_lock<T>(&self, id: AccountId, critical: impl FnOnce() -> Result<T>) -> Result<T> {
        let account_lock = self.account_locks.entry(id).or_default().clone();
        let outcome = {
            let _account = lock(&*account_lock);
            critical()
        };

        drop(account_lock);
        self.account_locks
            .remove_if(&id, |_, account_lock| Arc::strong_count(account_lock) == 1);
        outcome
    }

    #[cfg(test)]
    fn lock_table_len(&self) -> usize {
        self.account_locks.len()
    }
}

/// Takes a mutex, recovering the guard if another thread panicked holding it.
///
/// The guarded data is `()`, which a panic cannot leave half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
