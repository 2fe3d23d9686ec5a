//! Integration tests for the account ledger CLI.
//!
//! These tests run the actual binary against temporary command files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a command file into `dir` and return its path
fn write_commands(dir: &Path, name: &str, csv: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, csv).unwrap();
    path
}

/// Run the binary with the given arguments and return stdout
fn run_ledger(args: &[&Path]) -> String {
    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    let assert = cmd.args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

const SCENARIO: &str = "op,account,name,tax_id,amount
create,1001,Ana,111.111.111-11,
deposit,1001,,,100.00
withdraw,1001,,,30.00
withdraw,1001,,,1000.00
create,1002,Bia,111.111.111-11,
remove,1001,,,
create,1003,Caio,333.333.333-33,12.5
";

#[test]
fn test_scenario_output() {
    let dir = TempDir::new().unwrap();
    let input = write_commands(dir.path(), "commands.csv", SCENARIO);

    let output = run_ledger(&[input.as_path()]);
    assert_eq!(
        output,
        "account,holder,tax_id,balance\n\
         1001,Ana,111.111.111-11,70.00\n\
         1003,Caio,333.333.333-33,12.50\n"
    );
}

#[test]
fn test_report_flag() {
    let dir = TempDir::new().unwrap();
    let input = write_commands(dir.path(), "commands.csv", SCENARIO);

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg(&input)
        .arg("--report")
        .assert()
        .success()
        .stdout("accounts,with_positive_balance,total_balance\n2,2,82.50\n");
}

#[test]
fn test_store_persists_between_runs() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("accounts.csv");
    let first = write_commands(
        dir.path(),
        "first.csv",
        "op,account,name,tax_id,amount\ncreate,1,Ana,111.111.111-11,50\n",
    );
    let second = write_commands(
        dir.path(),
        "second.csv",
        "op,account,name,tax_id,amount\n\
         withdraw,1,,,20\n\
         create,2,Other,111.111.111-11,\n",
    );

    run_ledger(&[first.as_path(), store.as_path()]);
    let output = run_ledger(&[second.as_path(), store.as_path()]);

    assert_eq!(
        output,
        "account,holder,tax_id,balance\n1,Ana,111.111.111-11,30.00\n"
    );
    let stored = fs::read_to_string(&store).unwrap();
    assert!(stored.starts_with("account,holder,tax_id,balance,created_at"));
    assert!(stored.contains("1,Ana,111.111.111-11,30.00,"));
}

#[test]
fn test_corrupt_store_fails() {
    let dir = TempDir::new().unwrap();
    let store = write_commands(
        dir.path(),
        "accounts.csv",
        "account,holder,tax_id,balance,created_at\n0,Ana,111.111.111-11,1.00,2024-01-01T00:00:00Z\n",
    );
    let input = write_commands(dir.path(), "commands.csv", "op,account,name,tax_id,amount\n");

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg(&input)
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Corrupt record at row 2"));
}

#[test]
fn test_rejected_commands_are_logged() {
    let dir = TempDir::new().unwrap();
    let input = write_commands(dir.path(), "commands.csv", SCENARIO);

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.env("RUST_LOG", "warn")
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("Row 5: Insufficient funds"))
        .stderr(predicate::str::contains("Row 6: Holder tax id 111.111.111-11"))
        .stderr(predicate::str::contains("Row 7: Account 1001 still holds 70.00"));
}

#[test]
fn test_missing_file_error() {
    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg("nonexistent.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_missing_argument_error() {
    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Missing input file"));
}

#[test]
fn test_unknown_option_error() {
    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg("commands.csv")
        .arg("--verbose")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown option --verbose"));
}

#[test]
fn test_extra_positional_argument_error() {
    let dir = TempDir::new().unwrap();
    let input = write_commands(dir.path(), "commands.csv", SCENARIO);
    let store = dir.path().join("accounts.csv");

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg(&input)
        .arg(&store)
        .arg("extra.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unexpected argument extra.csv"));
    assert!(!store.exists());
}

#[test]
fn test_balances_have_two_decimal_places() {
    let dir = TempDir::new().unwrap();
    let input = write_commands(dir.path(), "commands.csv", SCENARIO);
    let output = run_ledger(&[input.as_path()]);

    for line in output.lines().skip(1) {
        let balance = line.rsplit(',').next().unwrap();
        let dot_pos = balance.find('.').unwrap();
        assert_eq!(balance.len() - dot_pos - 1, 2, "Expected 2 decimal places in: {}", balance);
    }
}
