//! Black-box tests against the `cpulimitd` binary itself, via `assert_cmd`.
//! Covers the fast-failing argument/config paths; the long-running daemon
//! loop (which only exits on a signal) is exercised through `Handle`
//! directly in `worker_integration.rs` instead.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn rejects_a_config_file_that_fails_validation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"discovery_period_ms":0,"control_period_ms":40,"alpha":0.08,"min_sample_interval_ms":20,"epsilon":0.001,"proc_root":"/proc"}}"#).unwrap();

    Command::cargo_bin("cpulimitd")
        .unwrap()
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration Error"));
}

#[test]
fn rejects_malformed_limit_argument() {
    Command::cargo_bin("cpulimitd")
        .unwrap()
        .args(["--limit", "not-a-pid"])
        .assert()
        .failure();
}

#[test]
fn rejects_limit_argument_missing_colon() {
    Command::cargo_bin("cpulimitd")
        .unwrap()
        .args(["--limit", "1234"])
        .assert()
        .failure();
}

#[test]
fn help_describes_the_daemon() {
    Command::cargo_bin("cpulimitd")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Per-process CPU usage limiter"));
}
