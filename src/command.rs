//! Command records for CSV parsing and their typed representation.

use crate::error::{LedgerError, Result};
use crate::holder::{AccountId, Holder};
use crate::money::Money;
use serde::Deserialize;
use std::str::FromStr;

/// Raw command record as read from CSV.
///
/// Every column except `op` and `account` is optional; which ones are
/// required depends on the operation.
#[derive(Debug, Deserialize)]
pub struct CommandRecord {
    /// Operation: create, deposit, withdraw, rename, remove, balance
    pub op: String,

    /// Account number the command targets
    pub account: i64,

    /// Holder name (create, rename)
    pub name: Option<String>,

    /// Holder tax id (create, rename)
    pub tax_id: Option<String>,

    /// Amount (deposit, withdraw; optional initial balance for create)
    pub amount: Option<String>,
}

impl CommandRecord {
    /// Parses the raw CSV record into a typed command.
    ///
    /// Fails with `InvalidCommand` on an unknown operation or a missing
    /// column, and with the validation error of the offending field otherwise.
    pub fn parse(&self) -> Result<Command> {
        let account = AccountId::try_from(self.account)?;
        let op = self.op.trim().to_lowercase();

        let kind = match op.as_str() {
            "create" => CommandKind::Create {
                holder: self.parse_holder()?,
                initial_balance: self.parse_optional_amount()?.unwrap_or(Money::ZERO),
            },
            "deposit" => CommandKind::Deposit(self.parse_amount()?),
            "withdraw" | "withdrawal" => CommandKind::Withdraw(self.parse_amount()?),
            "rename" => CommandKind::Rename(self.parse_holder()?),
            "remove" => CommandKind::Remove,
            "balance" => CommandKind::Balance,
            other => {
                return Err(LedgerError::InvalidCommand(format!(
                    "unknown operation {:?}",
                    other
                )))
            }
        };

        Ok(Command { account, kind })
    }

    fn parse_holder(&self) -> Result<Holder> {
        let name = required(&self.name, "name")?;
        let tax_id = required(&self.tax_id, "tax_id")?;
        Holder::parse(name, tax_id)
    }

    fn parse_amount(&self) -> Result<Money> {
        self.parse_optional_amount()?
            .ok_or_else(|| LedgerError::InvalidCommand("missing amount".to_string()))
    }

    /// Parses the amount column, treating a blank cell as absent.
    fn parse_optional_amount(&self) -> Result<Option<Money>> {
        match self.amount.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Money::from_str(raw)
                .map(Some)
                .map_err(|e| LedgerError::InvalidCommand(format!("amount {:?}: {}", raw, e))),
        }
    }
}

fn required<'a>(field: &'a Option<String>, column: &str) -> Result<&'a str> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(LedgerError::InvalidCommand(format!("missing {}", column))),
    }
}

/// A parsed and validated command ready to run against the directory.
#[derive(Debug, Clone)]
pub struct Command {
    /// Target account
    pub account: AccountId,

    /// Operation with associated data
    pub kind: CommandKind,
}

/// Command variants with associated data.
#[derive(Debug, Clone)]
pub enum CommandKind {
    /// Open an account, optionally funding it.
    Create {
        holder: Holder,
        initial_balance: Money,
    },

    /// Credit funds.
    Deposit(Money),

    /// Debit funds if the balance covers them.
    Withdraw(Money),

    /// Replace the holder.
    Rename(Holder),

    /// Delete an empty account.
    Remove,

    /// Balance inquiry; no mutation.
    Balance,
}
