//! # Account Ledger
//!
//! Bank accounts with enforced balance and identity invariants: create,
//! deposit, withdraw, rename the holder, remove, and balance inquiries,
//! driven from CSV command files.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: Uses 2 decimal places via `rust_decimal`
//! - **No overdraft**: `balance >= 0` after every operation
//! - **Unique identities**: one account per id and per holder tax id
//! - **All-or-nothing operations**: per-account locking, persist on success only
//!
//! ## Example
//!
//! ```
//! use account_ledger::{AccountDirectory, AccountId, Holder, MemoryStore, Money};
//! use std::str::FromStr;
//!
//! let directory = AccountDirectory::new(MemoryStore::new());
//! let id = AccountId::try_from(1001).unwrap();
//! let holder = Holder::parse("Ana", "111.111.111-11").unwrap();
//!
//! directory.create(id, holder, Money::ZERO).unwrap();
//! directory.deposit(id, Money::from_str("100.00").unwrap()).unwrap();
//! directory.withdraw(id, Money::from_str("30.00").unwrap()).unwrap();
//! assert_eq!(directory.balance(id).unwrap().to_string(), "70.00");
//! ```

pub mod account;
pub mod command;
pub mod directory;
pub mod error;
pub mod holder;
pub mod money;
pub mod processor;
pub mod store;

pub use account::Account;
pub use command::{Command, CommandKind, CommandRecord};
pub use directory::AccountDirectory;
pub use error::{CliError, ErrorKind, LedgerError, ParseMoneyError, Result, StorageError};
pub use holder::{AccountId, Holder, TaxId};
pub use money::Money;
pub use processor::{CommandProcessor, ProcessSummary};
pub use store::{AccountStore, CsvFileStore, MemoryStore};
