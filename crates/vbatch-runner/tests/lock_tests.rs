#![allow(dead_code)]

use harness::TestHarness;
use predicates::str::contains;

#[test]
fn test_set_then_query_then_unset() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args(["lock", "set", "build.txt", "--path", "s3://cbmc/run-1/ws"])
        .assert()
        .success()
        .stdout(contains("cbmc/run-1/ws/build.txt"));
    assert!(harness.object_file("cbmc/run-1/ws/build.txt").is_file());

    harness
        .cmd()
        .args(["lock", "is-set", "build.txt", "--path", "cbmc/run-1/ws"])
        .assert()
        .success()
        .stdout(contains("true"));

    harness
        .cmd()
        .args(["lock", "unset", "build.txt", "--path", "cbmc/run-1/ws"])
        .assert()
        .success();
    assert!(!harness.object_file("cbmc/run-1/ws/build.txt").exists());

    harness
        .cmd()
        .args(["lock", "is-unset", "build.txt", "--path", "cbmc/run-1/ws"])
        .assert()
        .success()
        .stdout(contains("true"));
}

#[test]
fn test_jobname_selects_workspace_prefix() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args(["lock", "set", "report.txt", "--jobname", "cbmc-run"])
        .assert()
        .success();
    assert!(harness.object_file("cbmc/cbmc-run/ws/report.txt").is_file());
}

#[test]
fn test_unknown_lock_name_fails() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args(["lock", "set", "Build.txt", "--path", "cbmc/run-1/ws"])
        .assert()
        .failure()
        .stderr(contains("Unknown lock: 'Build.txt'"));
    assert!(!harness.object_file("cbmc/run-1/ws/Build.txt").exists());
}

#[test]
fn test_wait_for_missing_lock_times_out() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args([
            "lock",
            "wait-set",
            "coverage.txt",
            "--path",
            "cbmc/run-1/ws",
            "--interval",
            "1",
            "--bound",
            "0s",
        ])
        .assert()
        .failure()
        .stderr(contains("Timed out waiting for lock 'coverage.txt'"))
        .stderr(contains("after 1 checks"));
}

#[test]
fn test_wait_for_present_lock_returns() {
    let harness = TestHarness::new();
    harness
        .cmd()
        .args(["lock", "set", "property.txt", "--path", "cbmc/run-1/ws"])
        .assert()
        .success();

    harness
        .cmd()
        .args([
            "lock",
            "wait-set",
            "property.txt",
            "--path",
            "cbmc/run-1/ws",
            "--bound",
            "1m",
        ])
        .assert()
        .success()
        .stdout(contains("cbmc/run-1/ws/property.txt is set"));
}

#[test]
fn test_bad_bound_is_rejected() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args([
            "lock",
            "wait-unset",
            "build.txt",
            "--path",
            "cbmc/run-1/ws",
            "--bound",
            "5 minutes",
        ])
        .assert()
        .failure()
        .stderr(contains("Can't parse time bound"));
}

#[test]
fn test_missing_bucket_fails() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args(["lock", "set", "build.txt", "--path", "nowhere/run-1/ws"])
        .assert()
        .failure()
        .stderr(contains("Bucket does not exist: nowhere"));
}

#[test]
fn test_path_or_jobname_is_required() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args(["lock", "set", "build.txt"])
        .assert()
        .failure();
}
