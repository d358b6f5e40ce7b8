use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn coffer(db_path: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_coffer"));
    cmd.env_remove("COFFER_DATABASE")
        .env_remove("RUST_LOG")
        .arg("--database")
        .arg(db_path);
    cmd
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let db = temp.path().join("cli.db");

    coffer(&db)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database initialized"));

    coffer(&db)
        .args(["account", "create", "Xavier", "--balance", "100.00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created account 1: Xavier (100.00)"));
    coffer(&db)
        .args(["account", "create", "Yvonne", "--balance", "50.00", "--email", "y@example.com"])
        .assert()
        .success();

    coffer(&db)
        .args(["transfer", "1", "--to", "2", "--amount", "30.00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transfer successful"));

    coffer(&db)
        .args(["account", "balance", "1"])
        .assert()
        .success()
        .stdout(predicate::str::diff("70.00\n"));
    coffer(&db)
        .args(["account", "balance", "2"])
        .assert()
        .success()
        .stdout(predicate::str::diff("80.00\n"));

    coffer(&db)
        .args(["transactions", "2", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id,account_id,amount,created_at"))
        .stdout(predicate::str::contains(",2,30.00,"));

    coffer(&db)
        .args(["account", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_elements\": 2"))
        .stdout(predicate::str::contains("y@example.com"));

    Ok(())
}

#[test]
fn test_cli_error_exit_codes() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let db = temp.path().join("cli.db");

    coffer(&db).arg("init").assert().success();
    coffer(&db)
        .args(["account", "create", "Xavier", "--balance", "70.00"])
        .assert()
        .success();
    coffer(&db)
        .args(["account", "create", "Yvonne", "--balance", "80.00"])
        .assert()
        .success();

    // Rejected transfer
    coffer(&db)
        .args(["transfer", "1", "--to", "2", "--amount", "1000.00"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Insufficient funds in account with id: 1",
        ));

    // Unknown account in a transfer is a rejection, elsewhere it is not found
    coffer(&db)
        .args(["transfer", "1", "--to", "99", "--amount", "1.00"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Account not found with id: 99"));
    coffer(&db)
        .args(["account", "show", "99"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Account not found with id: 99"));
    coffer(&db)
        .args(["account", "delete", "99"])
        .assert()
        .code(3);

    coffer(&db)
        .args(["transfer", "1", "--to", "2", "--amount", "ten"])
        .assert()
        .code(2);

    coffer(&db)
        .args(["account", "balance", "1"])
        .assert()
        .success()
        .stdout(predicate::str::diff("70.00\n"));

    Ok(())
}
