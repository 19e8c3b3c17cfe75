//! CLI argument validation tests.
//!
//! Tests command-line argument parsing, validation, and error handling.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_no_subcommand_shows_usage() {
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage").or(predicate::str::contains("Commands")));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("build").and(predicate::str::contains("train")));
}

// === Build Argument Tests ===

#[test]
fn test_build_requires_data_dir_and_out() {
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("build");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--data-dir").or(predicate::str::contains("required")));
}

#[test]
fn test_build_rejects_non_positive_sigma() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("build")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--out")
        .arg(temp_dir.path().join("store"))
        .arg("--sigma")
        .arg("-3.0");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not positive").or(predicate::str::contains("invalid")));
}

#[test]
fn test_build_missing_corpus_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("build")
        .arg("--quiet")
        .arg("--data-dir")
        .arg(temp_dir.path().join("nope"))
        .arg("--out")
        .arg(temp_dir.path().join("store"));
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("images"));
}

// === Train Argument Tests ===

#[test]
fn test_train_rejects_unknown_model() {
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("train").arg("--model").arg("transformer");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value").or(predicate::str::contains("possible")));
}

#[test]
fn test_train_rejects_unknown_optimizer() {
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("train").arg("--optim").arg("adagrad");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value").or(predicate::str::contains("possible")));
}

#[test]
fn test_train_missing_dataset_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("train")
        .arg("--quiet")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--dataset")
        .arg("ghost");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("No sample store"));
}
