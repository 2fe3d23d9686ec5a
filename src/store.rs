//! Persistence port for accounts and its two adapters.
//!
//! The directory only ever reads and writes whole [`Account`] records keyed by
//! id; how they are kept is up to the store.

use crate::account::Account;
use crate::error::StorageError;
use crate::holder::{AccountId, Holder, TaxId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tempfile::NamedTempFile;

/// Synchronous key-value store of accounts.
///
/// Implementations must be safe to share between threads. `list_all` returns
/// accounts in insertion order.
pub trait AccountStore: Send + Sync {
    fn get(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// Inserts or replaces the record with the same id.
    fn put(&self, account: &Account) -> Result<(), StorageError>;

    /// Removes the record, returning `false` if it did not exist.
    fn delete(&self, id: AccountId) -> Result<bool, StorageError>;

    fn list_all(&self) -> Result<Vec<Account>, StorageError>;

    fn exists_by_id(&self, id: AccountId) -> Result<bool, StorageError>;

    fn find_by_holder_tax_id(&self, tax_id: &TaxId) -> Result<Option<Account>, StorageError>;

    fn exists_by_holder_tax_id(&self, tax_id: &TaxId) -> Result<bool, StorageError> {
        Ok(self.find_by_holder_tax_id(tax_id)?.is_some())
    }
}

/// Accounts indexed by id, remembering insertion order.
#[derive(Debug, Clone, Default)]
struct AccountTable {
    rows: HashMap<AccountId, Account>,
    order: Vec<AccountId>,
}

impl AccountTable {
    fn get(&self, id: AccountId) -> Option<&Account> {
        self.rows.get(&id)
    }

    fn upsert(&mut self, account: Account) {
        let id = account.id();
        if self.rows.insert(id, account).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: AccountId) -> bool {
        if self.rows.remove(&id).is_none() {
            return false;
        }
        self.order.retain(|existing| *existing != id);
        true
    }

    fn iter(&self) -> impl Iterator<Item = &Account> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }

    fn find_by_tax_id(&self, tax_id: &TaxId) -> Option<&Account> {
        self.iter().find(|account| account.holder().tax_id() == tax_id)
    }
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<AccountTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryStore {
    fn get(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.get(id).cloned())
    }

    fn put(&self, account: &Account) -> Result<(), StorageError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table.upsert(account.clone());
        Ok(())
    }

    fn delete(&self, id: AccountId) -> Result<bool, StorageError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        Ok(table.remove(id))
    }

    fn list_all(&self) -> Result<Vec<Account>, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.iter().cloned().collect())
    }

    fn exists_by_id(&self, id: AccountId) -> Result<bool, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.get(id).is_some())
    }

    fn find_by_holder_tax_id(&self, tax_id: &TaxId) -> Result<Option<Account>, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.find_by_tax_id(tax_id).cloned())
    }
}

/// One stored account as a CSV row.
#[derive(Debug, Serialize, Deserialize)]
struct AccountRow {
    account: i64,
    holder: String,
    tax_id: String,
    balance: Money,
    created_at: DateTime<Utc>,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        AccountRow {
            account: i64::from(account.id().get()),
            holder: account.holder().name().to_string(),
            tax_id: account.holder().tax_id().to_string(),
            balance: account.balance(),
            created_at: account.created_at(),
        }
    }
}

impl AccountRow {
    fn into_account(self) -> crate::Result<Account> {
        let id = AccountId::try_from(self.account)?;
        let holder = Holder::parse(&self.holder, &self.tax_id)?;
        Account::restore(id, holder, self.balance, self.created_at)
    }
}

/// Store that keeps the whole table in one CSV file.
///
/// The file is read once on [`open`](CsvFileStore::open) and rewritten on
/// every change. A change is only committed in memory after the file was
/// replaced, so a failed write leaves both the file and the table as they
/// were.
#[derive(Debug)]
pub struct CsvFileStore {
    path: PathBuf,
    table: RwLock<AccountTable>,
}

impl CsvFileStore {
    /// Opens the store at `path`, loading existing rows if the file exists.
    ///
    /// Rows that break an account invariant, duplicate an id or reuse a
    /// holder tax id fail with `StorageError::Corrupt`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut table = AccountTable::default();

        if path.exists() {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_path(&path)?;

            for (row_idx, result) in reader.deserialize::<AccountRow>().enumerate() {
                let row = row_idx + 2; // 1-indexed, accounting for header row
                let account = result?
                    .into_account()
                    .map_err(|e| StorageError::Corrupt {
                        row,
                        message: e.to_string(),
                    })?;

                if table.get(account.id()).is_some() {
                    return Err(StorageError::Corrupt {
                        row,
                        message: format!("duplicate account {}", account.id()),
                    });
                }
                if table.find_by_tax_id(account.holder().tax_id()).is_some() {
                    return Err(StorageError::Corrupt {
                        row,
                        message: format!("duplicate tax id {}", account.holder().tax_id()),
                    });
                }
                table.upsert(account);
            }
            debug!("Loaded {} accounts from {}", table.rows.len(), path.display());
        }

        Ok(CsvFileStore {
            path,
            table: RwLock::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `table` to a sibling temp file, then renames it over the store.
    fn persist(&self, table: &AccountTable) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // Removed on drop if anything below fails
        let mut tmp = NamedTempFile::new_in(dir)?;

        let mut writer = csv::Writer::from_writer(&mut tmp);
        for account in table.iter() {
            writer.serialize(AccountRow::from(account))?;
        }
        writer.flush()?;
        drop(writer);
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path)
            .map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    /// Applies `change` to a copy of the table and commits it once persisted.
    fn write_through<T>(
        &self,
        change: impl FnOnce(&mut AccountTable) -> T,
    ) -> Result<T, StorageError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = table.clone();
        let outcome = change(&mut candidate);
        self.persist(&candidate)?;
        *table = candidate;
        Ok(outcome)
    }
}

impl AccountStore for CsvFileStore {
    fn get(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.get(id).cloned())
    }

    fn put(&self, account: &Account) -> Result<(), StorageError> {
        self.write_through(|table| table.upsert(account.clone()))
    }

    fn delete(&self, id: AccountId) -> Result<bool, StorageError> {
        {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            if table.get(id).is_none() {
                return Ok(false);
            }
        }
        self.write_through(|table| table.remove(id))
    }

    fn list_all(&self) -> Result<Vec<Account>, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.iter().cloned().collect())
    }

    fn exists_by_id(&self, id: AccountId) -> Result<bool, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.get(id).is_some())
    }

    fn find_by_holder_tax_id(&self, tax_id: &TaxId) -> Result<Option<Account>, StorageError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.find_by_tax_id(tax_id).cloned())
    }
}
