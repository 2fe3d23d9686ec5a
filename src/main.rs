//! Account Ledger CLI
//!
//! Applies a CSV command file to the account directory and prints the
//! resulting accounts (or the summary report) as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > accounts.csv
//! cargo run -- commands.csv store.csv --report
//! ```
//!
//! When a store path is given, accounts are loaded from and persisted to
//! that file; otherwise they live in memory for the duration of the run.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug`, `info` or `warn` to control logging verbosity

use account_ledger::{
    AccountStore, CliError, CommandProcessor, CsvFileStore, LedgerError, MemoryStore,
};
use log::info;
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

/// Parsed command-line arguments.
struct Args {
    commands: String,
    store: Option<String>,
    report: bool,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Result<Self, CliError> {
        let mut positional = Vec::new();
        let mut report = false;

        for arg in raw {
            if arg == "--report" {
                report = true;
            } else if arg.starts_with("--") {
                return Err(CliError::UnknownOption(arg));
            } else {
                positional.push(arg);
            }
        }

        let mut positional = positional.into_iter();
        let commands = positional.next().ok_or(CliError::MissingArgument)?;
        let store = positional.next();
        if let Some(extra) = positional.next() {
            return Err(CliError::UnexpectedArgument(extra));
        }
        Ok(Args {
            commands,
            store,
            report,
        })
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let args = Args::parse(env::args().skip(1))?;

    match &args.store {
        Some(path) => {
            let store = CsvFileStore::open(path).map_err(LedgerError::from)?;
            info!("Using account store {}", store.path().display());
            execute(store, &args)
        }
        None => execute(MemoryStore::new(), &args),
    }
}

fn execute<S: AccountStore>(store: S, args: &Args) -> Result<(), CliError> {
    let file = File::open(&args.commands)?;
    let reader = BufReader::new(file);

    let processor = CommandProcessor::new(store);
    processor.process_csv(reader)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    if args.report {
        processor.write_report(handle)?;
    } else {
        processor.write_output(handle)?;
    }

    Ok(())
}
