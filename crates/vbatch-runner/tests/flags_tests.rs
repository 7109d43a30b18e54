#![allow(dead_code)]

use harness::TestHarness;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

#[test]
fn test_encode_words() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args([
            "flags",
            "encode",
            "--",
            "--unwind",
            "1",
            "--unwindset",
            "loop.0:3,loop.1:4",
            "--trace",
        ])
        .assert()
        .success()
        .stdout(contains("--unwind;1;--unwindset;loop.0:3,loop.1:4;--trace"));
}

#[test]
fn test_decode_shows_every_flag() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args(["flags", "decode", "--", "--bounds-check;--unwind;5;--trace"])
        .assert()
        .success()
        .stdout(contains("--bounds-check"))
        .stdout(contains("--unwind"))
        .stdout(contains("5"))
        .stdout(contains("--trace"));
}

#[test]
fn test_decode_for_coverage_drops_incompatible_flags() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args([
            "flags",
            "decode",
            "--coverage",
            "--",
            "--unwind;5;--trace;--stop-on-fail;--unwinding-assertions",
        ])
        .assert()
        .success()
        .stdout(contains("--unwind"))
        .stdout(contains("--trace").not())
        .stdout(contains("--stop-on-fail").not())
        .stdout(contains("--unwinding-assertions").not());
}

#[test]
fn test_decode_rejects_malformed_unwindset() {
    let harness = TestHarness::new();

    harness
        .cmd()
        .args(["flags", "decode", "--", "--unwindset;loop.0"])
        .assert()
        .failure()
        .stderr(contains("Malformed tool flags"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let harness = TestHarness::new();
    let missing = harness.test_root.join("missing.toml");

    harness
        .cmd()
        .arg("--config")
        .arg(&missing)
        .args(["flags", "decode", "--", "--trace"])
        .assert()
        .failure()
        .stderr(contains("missing.toml"));
}
