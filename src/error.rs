//! Error types for the account ledger.

use crate::holder::{AccountId, TaxId};
use crate::money::Money;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Coarse classification of a [`LedgerError`].
///
/// Adapters map each kind to their own response (a status code, an exit
/// code, a log line) without matching on every variant's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    DuplicateId,
    DuplicateHolder,
    InvalidAmount,
    InsufficientFunds,
    NonZeroBalance,
    Overflow,
    InvalidInput,
    StorageFailure,
}

/// Errors raised by accounts, the directory and the command processor.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Referenced account does not exist
    #[error("Account {0} not found")]
    NotFound(AccountId),

    /// Create with an id that is already taken
    #[error("Account {0} already exists")]
    DuplicateId(AccountId),

    /// Holder tax id already belongs to another account
    #[error("Holder tax id {tax_id} already belongs to account {owner}")]
    DuplicateHolder { tax_id: TaxId, owner: AccountId },

    /// Deposit or withdrawal amount is not strictly positive
    #[error("Invalid amount {0}: must be greater than zero")]
    InvalidAmount(Money),

    /// Withdrawal exceeds the current balance
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Money, available: Money },

    /// Removal attempted while money is still in the account
    #[error("Account {id} still holds {balance}")]
    NonZeroBalance { id: AccountId, balance: Money },

    /// Sum of balances does not fit in a money amount
    #[error("Total balance exceeds the representable range")]
    TotalOverflow,

    /// Account number is zero, negative or out of range
    #[error("Invalid account id {0}: must be a positive integer")]
    InvalidAccountId(i64),

    /// Holder name or tax id failed validation
    #[error("Invalid holder: {0}")]
    InvalidHolder(String),

    /// Command record could not be interpreted
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Persistent store failed; fatal for the current operation
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::DuplicateId(_) => ErrorKind::DuplicateId,
            LedgerError::DuplicateHolder { .. } => ErrorKind::DuplicateHolder,
            LedgerError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::NonZeroBalance { .. } => ErrorKind::NonZeroBalance,
            LedgerError::TotalOverflow => ErrorKind::Overflow,
            LedgerError::InvalidAccountId(_)
            | LedgerError::InvalidHolder(_)
            | LedgerError::InvalidCommand(_) => ErrorKind::InvalidInput,
            LedgerError::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Returns `true` for rule violations the caller is expected to handle.
    ///
    /// Only storage failures are unexpected.
    pub fn is_business_rule(&self) -> bool {
        self.kind() != ErrorKind::StorageFailure
    }
}

/// Failures of the persistent account store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A stored row violates an account invariant
    #[error("Corrupt record at row {row}: {message}")]
    Corrupt { row: usize, message: String },
}

/// Failure to parse a money amount.
#[derive(Error, Debug)]
pub enum ParseMoneyError {
    #[error("empty amount")]
    Empty,

    #[error("not a decimal number: {0}")]
    Decimal(rust_decimal::Error),

    #[error("amount {0} has more than 2 decimal places")]
    TooPrecise(String),

    #[error("amount {0} is too large to hold 2 decimal places")]
    OutOfRange(String),
}

/// Errors surfaced by the command-line binary.
#[derive(Error, Debug)]
pub enum CliError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: account-ledger <commands.csv> [store.csv] [--report]")]
    MissingArgument,

    #[error("Unknown option {0}")]
    UnknownOption(String),

    #[error("Unexpected argument {0}. Usage: account-ledger <commands.csv> [store.csv] [--report]")]
    UnexpectedArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> AccountId {
        AccountId::try_from(raw).unwrap()
    }

    #[test]
    fn test_kinds_separate_business_rules_from_storage() {
        assert_eq!(LedgerError::NotFound(id(1)).kind(), ErrorKind::NotFound);
        assert!(LedgerError::NotFound(id(1)).is_business_rule());
        assert!(LedgerError::InvalidAmount(Money::ZERO).is_business_rule());

        let storage = LedgerError::from(StorageError::Corrupt {
            row: 2,
            message: "negative balance".to_string(),
        });
        assert_eq!(storage.kind(), ErrorKind::StorageFailure);
        assert!(!storage.is_business_rule());
    }

    #[test]
    fn test_messages_carry_amounts() {
        let err = LedgerError::InsufficientFunds {
            requested: Money::from_cents(100_000),
            available: Money::from_cents(7_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: requested 1000.00, available 70.00"
        );
    }
}
