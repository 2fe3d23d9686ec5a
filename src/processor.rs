//! Batch command processor.
//!
//! Streams command rows from CSV, applies each one to an [`AccountDirectory`]
//! and renders the resulting accounts. Rule violations are logged and the
//! row is skipped; a storage failure stops processing.

use crate::command::{Command, CommandKind, CommandRecord};
use crate::directory::AccountDirectory;
use crate::error::{LedgerError, Result};
use crate::store::AccountStore;
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use std::io::{Read, Write};

/// Counts of applied and rejected rows for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Applies command files to an account directory.
pub struct CommandProcessor<S> {
    directory: AccountDirectory<S>,
}

impl<S: AccountStore> CommandProcessor<S> {
    /// Creates a processor over a directory backed by `store`.
    pub fn new(store: S) -> Self {
        CommandProcessor {
            directory: AccountDirectory::new(store),
        }
    }

    pub fn directory(&self) -> &AccountDirectory<S> {
        &self.directory
    }

    /// Processes commands from a CSV reader in streaming fashion.
    ///
    /// Records are read one at a time. Malformed or rejected records are
    /// logged at warn level and skipped.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` as soon as the store fails; rows
    /// applied before that point stay applied.
    pub fn process_csv<R: Read>(&self, reader: R) -> Result<ProcessSummary> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut summary = ProcessSummary::default();

        for (row_idx, result) in csv_reader.deserialize::<CommandRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let outcome = match result {
                Ok(record) => record.parse().and_then(|cmd| self.apply(cmd, row_num)),
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    summary.rejected += 1;
                    continue;
                }
            };

            match outcome {
                Ok(()) => summary.applied += 1,
                Err(e) if e.is_business_rule() => {
                    warn!("Row {}: {}", row_num, e);
                    summary.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Processed {} commands ({} rejected)",
            summary.applied + summary.rejected,
            summary.rejected
        );
        Ok(summary)
    }

    /// Runs a single parsed command.
    fn apply(&self, cmd: Command, row: usize) -> Result<()> {
        let id = cmd.account;
        match cmd.kind {
            CommandKind::Create {
                holder,
                initial_balance,
            } => {
                self.directory.create(id, holder, initial_balance)?;
                debug!("Row {}: Created account {}", row, id);
            }
            CommandKind::Deposit(amount) => {
                let account = self.directory.deposit(id, amount)?;
                debug!(
                    "Row {}: Deposited {} to account {}, balance {}",
                    row,
                    amount,
                    id,
                    account.balance()
                );
            }
            CommandKind::Withdraw(amount) => {
                let account = self.directory.withdraw(id, amount)?;
                debug!(
                    "Row {}: Withdrew {} from account {}, balance {}",
                    row,
                    amount,
                    id,
                    account.balance()
                );
            }
            CommandKind::Rename(holder) => {
                self.directory.rename_holder(id, holder)?;
                debug!("Row {}: Renamed holder of account {}", row, id);
            }
            CommandKind::Remove => {
                self.directory.remove(id)?;
                debug!("Row {}: Removed account {}", row, id);
            }
            CommandKind::Balance => {
                let balance = self.directory.balance(id)?;
                info!("Row {}: Account {} balance {}", row, id, balance);
            }
        }
        Ok(())
    }

    /// Writes final account states to CSV, in insertion order.
    ///
    /// All monetary values are formatted with exactly 2 decimal places.
    pub fn write_output<W: Write>(&self, writer: W) -> Result<()> {
        let accounts = self.directory.list()?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(["account", "holder", "tax_id", "balance"])
            .map_err(output_error)?;

        for account in accounts {
            csv_writer
                .write_record([
                    account.id().to_string(),
                    account.holder().name().to_string(),
                    account.holder().tax_id().to_string(),
                    account.balance().to_string(),
                ])
                .map_err(output_error)?;
        }

        csv_writer.flush().map_err(|e| output_error(e.into()))?;
        Ok(())
    }

    /// Writes the directory-wide figures as a single CSV row.
    pub fn write_report<W: Write>(&self, writer: W) -> Result<()> {
        let accounts = self.directory.list()?.len();
        let positive = self.directory.count_with_positive_balance()?;
        let total = self.directory.total_balance()?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(["accounts", "with_positive_balance", "total_balance"])
            .map_err(output_error)?;
        csv_writer
            .write_record([accounts.to_string(), positive.to_string(), total.to_string()])
            .map_err(output_error)?;
        csv_writer.flush().map_err(|e| output_error(e.into()))?;
        Ok(())
    }
}

/// Output failures are reported through the storage taxonomy: they are not
/// rule violations and abort the run.
fn output_error(e: csv::Error) -> LedgerError {
    LedgerError::Storage(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::AccountId;
    use crate::store::MemoryStore;
    use std::io::Cursor;

    fn process_csv_str(csv: &str) -> (CommandProcessor<MemoryStore>, ProcessSummary) {
        let processor = CommandProcessor::new(MemoryStore::new());
        let summary = processor.process_csv(Cursor::new(csv)).unwrap();
        (processor, summary)
    }

    fn balance(processor: &CommandProcessor<MemoryStore>, raw: i64) -> String {
        let id = AccountId::try_from(raw).unwrap();
        processor.directory().balance(id).unwrap().to_string()
    }

    #[test]
    fn test_create_and_deposit() {
        let csv = r#"op,account,name,tax_id,amount
create,1,Ana,111.111.111-11,
deposit,1,,,10.0
deposit,1,,,5.0
create,2,Bia,222.222.222-22,20"#;

        let (processor, summary) = process_csv_str(csv);

        assert_eq!(summary, ProcessSummary { applied: 4, rejected: 0 });
        assert_eq!(balance(&processor, 1), "15.00");
        assert_eq!(balance(&processor, 2), "20.00");
    }

    #[test]
    fn test_rejected_rows_are_skipped() {
        let csv = r#"op,account,name,tax_id,amount
create,1,Ana,111.111.111-11,10
withdraw,1,,,15.0
deposit,1,,,-1
deposit,9,,,1
create,2,Bia,111.111.111-11,
transfer,1,,,1
withdraw,1,,,3"#;

        let (processor, summary) = process_csv_str(csv);

        assert_eq!(summary, ProcessSummary { applied: 2, rejected: 5 });
        assert_eq!(balance(&processor, 1), "7.00");
        assert_eq!(processor.directory().list().unwrap().len(), 1);
    }

    #[test]
    fn test_unparseable_row_is_counted() {
        let csv = r#"op,account,name,tax_id,amount
create,abc,Ana,111.111.111-11,
create,1,Ana,111.111.111-11,"#;

        let (_, summary) = process_csv_str(csv);
        assert_eq!(summary, ProcessSummary { applied: 1, rejected: 1 });
    }

    #[test]
    fn test_whitespace_handling() {
        let csv = r#"op, account, name, tax_id, amount
create, 1, Ana, 111.111.111-11, 10.0
withdraw, 1, , , 3.0"#;

        let (processor, _) = process_csv_str(csv);
        assert_eq!(balance(&processor, 1), "7.00");
    }

    #[test]
    fn test_output_format_keeps_insertion_order() {
        let csv = r#"op,account,name,tax_id,amount
create,2,Bia,222.222.222-22,2
create,1,Ana,111.111.111-11,1"#;

        let (processor, _) = process_csv_str(csv);
        let mut output = Vec::new();
        processor.write_output(&mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(
            output_str,
            "account,holder,tax_id,balance\n\
             2,Bia,222.222.222-22,2.00\n\
             1,Ana,111.111.111-11,1.00\n"
        );
    }

    #[test]
    fn test_report() {
        let csv = r#"op,account,name,tax_id,amount
create,1,Ana,111.111.111-11,10.25
create,2,Bia,222.222.222-22,
create,3,Caio,333.333.333-33,0.75"#;

        let (processor, _) = process_csv_str(csv);
        let mut output = Vec::new();
        processor.write_report(&mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "accounts,with_positive_balance,total_balance\n3,2,11.00\n"
        );
    }
}
