use assert_cmd::Command;
use predicates::prelude::*;

fn vbatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vbatch"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_all_lists_public_commands_only() {
    vbatch()
        .arg("--help-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("VBATCH - Complete Command Reference"))
        .stdout(predicate::str::contains("Command: vbatch submit"))
        .stdout(predicate::str::contains("Command: vbatch lock"))
        .stdout(predicate::str::contains("Command: vbatch flags encode"))
        .stdout(predicate::str::contains("internal-phase").not());
}

#[test]
fn test_bash_completions() {
    vbatch()
        .args(["completions", "--shell", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_vbatch()"));
}

#[test]
fn test_runner_commands_are_flattened() {
    vbatch()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--monitor"));
}
