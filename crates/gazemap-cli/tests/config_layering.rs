//! Integration tests for configuration layering.
//!
//! Tests the priority chain: hardcoded defaults < XDG config < project
//! config < CLI args.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use gazemap_core::{Sample, SampleSink, EMBED_DIM, IMAGE_LEN, MAP_LEN};
use predicates::prelude::*;

/// Writes a tiny two-sample store under `dir`.
fn write_store(dir: &Path) {
    use gazemap_adapters::SampleStoreWriter;

    let mut writer = SampleStoreWriter::create(dir).unwrap();
    for i in 0..2 {
        let mut saliency = vec![0.0f32; MAP_LEN];
        saliency[100 + i] = 1.0;
        let sample = Sample::new(vec![0.1; IMAGE_LEN], vec![0.2; EMBED_DIM], saliency).unwrap();
        writer.append(&sample).unwrap();
    }
    writer.finish().unwrap();
}

/// Number of epochs recorded in the history file under `results`.
fn recorded_epochs(results: &Path) -> usize {
    let history_file = std::fs::read_dir(results)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("history_"))
        })
        .expect("history file written");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(history_file).unwrap()).unwrap();
    json["val_loss"].as_array().unwrap().len()
}

#[test]
fn test_invalid_config_value_warns() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        temp_dir.path().join(".gazemap.toml"),
        "[build]\nsigma = -5.0\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("train")
        .arg("--quiet")
        .arg("--dataset")
        .arg("ghost");

    // The run fails on the missing dataset, but the config warning must
    // have been printed first.
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("build.sigma"));
}

#[test]
fn test_config_epochs_applied() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    write_store(&data_dir.join("tiny"));
    std::fs::write(
        temp_dir.path().join(".gazemap.toml"),
        "[train]\nepochs = 1\nbatch_size = 2\n",
    )
    .unwrap();
    let results = temp_dir.path().join("results");

    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("train")
        .arg("--quiet")
        .arg("--dataset")
        .arg("tiny")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--results-dir")
        .arg(&results);

    cmd.assert().success();
    assert_eq!(recorded_epochs(&results), 1);
}

#[test]
fn test_cli_epochs_override_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    write_store(&data_dir.join("tiny"));
    std::fs::write(
        temp_dir.path().join(".gazemap.toml"),
        "[train]\nepochs = 3\nbatch_size = 2\n",
    )
    .unwrap();
    let results = temp_dir.path().join("results");

    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("train")
        .arg("--quiet")
        .arg("--epochs")
        .arg("1")
        .arg("--dataset")
        .arg("tiny")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--results-dir")
        .arg(&results);

    cmd.assert().success();
    assert_eq!(recorded_epochs(&results), 1);
}
