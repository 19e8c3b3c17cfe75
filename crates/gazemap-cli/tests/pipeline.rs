//! End-to-end pipeline tests: corpus → store → training run.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use gazemap_adapters::SampleStore;
use gazemap_core::{SampleSource, EMBED_DIM, IMAGE_LEN, MAP_LEN};
use gazemap_test_support::{fixation_cluster, SyntheticCorpus};
use predicates::prelude::*;

/// Builds a small corpus: one usable image, one with no usable fixations.
fn write_corpus(root: &Path) {
    let corpus = SyntheticCorpus::new(root);
    corpus
        .add_image("scene1", 64, 48, &fixation_cluster(0.5, 0.5, 100))
        .unwrap();
    corpus.add_image("broken", 64, 48, &[]).unwrap();
}

fn parse_history(results: &Path) -> serde_json::Value {
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
    serde_json::from_str(&std::fs::read_to_string(history_file).unwrap()).unwrap()
}

#[test]
fn test_build_writes_store_and_skips_corrupt() {
    let temp_dir = tempfile::tempdir().unwrap();
    let corpus_dir = temp_dir.path().join("corpus");
    let store_dir = temp_dir.path().join("data").join("capgaze1");
    write_corpus(&corpus_dir);

    let mut cmd = Command::cargo_bin("gazemap").unwrap();
    cmd.arg("build")
        .arg("--data-dir")
        .arg(&corpus_dir)
        .arg("--out")
        .arg(&store_dir);

    // The decoy-only image is skipped as corrupt input; the rest succeeds.
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Skipping"));

    let store = SampleStore::open(&store_dir).unwrap();
    assert_eq!(store.len(), 1);

    let sample = store.get(0).unwrap();
    assert_eq!(sample.image.len(), IMAGE_LEN);
    assert_eq!(sample.caption.len(), EMBED_DIM);
    assert_eq!(sample.saliency.len(), MAP_LEN);
    assert!(sample.saliency.iter().all(|v| v.is_finite()));
    assert!(sample.saliency.iter().any(|&v| v > 0.9));
}

#[test]
fn test_build_is_reproducible() {
    let temp_dir = tempfile::tempdir().unwrap();
    let corpus_dir = temp_dir.path().join("corpus");
    write_corpus(&corpus_dir);

    for name in ["run_a", "run_b"] {
        let mut cmd = Command::cargo_bin("gazemap").unwrap();
        cmd.arg("build")
            .arg("--quiet")
            .arg("--data-dir")
            .arg(&corpus_dir)
            .arg("--out")
            .arg(temp_dir.path().join(name));
        cmd.assert().success();
    }

    let a = SampleStore::open(temp_dir.path().join("run_a")).unwrap();
    let b = SampleStore::open(temp_dir.path().join("run_b")).unwrap();
    assert_eq!(a.len(), b.len());
    let sample_a = a.get(0).unwrap();
    let sample_b = b.get(0).unwrap();
    assert_eq!(sample_a.caption, sample_b.caption);
    assert_eq!(sample_a.saliency, sample_b.saliency);
}

#[test]
fn test_validate_only_training_over_built_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let corpus_dir = temp_dir.path().join("corpus");
    let data_dir = temp_dir.path().join("data");
    let results = temp_dir.path().join("results");
    write_corpus(&corpus_dir);

    Command::cargo_bin("gazemap")
        .unwrap()
        .arg("build")
        .arg("--quiet")
        .arg("--data-dir")
        .arg(&corpus_dir)
        .arg("--out")
        .arg(data_dir.join("capgaze1"))
        .assert()
        .success();

    Command::cargo_bin("gazemap")
        .unwrap()
        .arg("train")
        .arg("--quiet")
        .arg("--dataset")
        .arg("capgaze1")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--epochs")
        .arg("1")
        .arg("--batch-size")
        .arg("2")
        .arg("--results-dir")
        .arg(&results)
        .assert()
        .success();

    let history = parse_history(&results);
    // Validate-only: val metrics present with one epoch each, no train split.
    for metric in ["val_loss", "val_auc", "val_cc", "val_nss", "val_kldiv", "val_sim"] {
        assert_eq!(
            history[metric].as_array().map(Vec::len),
            Some(1),
            "missing {metric}"
        );
    }
    assert!(history.get("train_loss").is_none());
}

#[test]
fn test_split_dataset_trains_and_validates() {
    let temp_dir = tempfile::tempdir().unwrap();
    let corpus_dir = temp_dir.path().join("corpus");
    let data_dir = temp_dir.path().join("data");
    let results = temp_dir.path().join("results");
    write_corpus(&corpus_dir);

    for split in ["train", "val"] {
        Command::cargo_bin("gazemap")
            .unwrap()
            .arg("build")
            .arg("--quiet")
            .arg("--data-dir")
            .arg(&corpus_dir)
            .arg("--out")
            .arg(data_dir.join("salicon").join(split))
            .assert()
            .success();
    }

    Command::cargo_bin("gazemap")
        .unwrap()
        .arg("train")
        .arg("--quiet")
        .arg("--dataset")
        .arg("salicon")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--epochs")
        .arg("1")
        .arg("--batch-size")
        .arg("2")
        .arg("--lr")
        .arg("0.001")
        .arg("--results-dir")
        .arg(&results)
        .assert()
        .success();

    let history = parse_history(&results);
    assert_eq!(history["train_loss"].as_array().map(Vec::len), Some(1));
    assert_eq!(history["val_loss"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_checkpoint_save_and_reload() {
    let temp_dir = tempfile::tempdir().unwrap();
    let corpus_dir = temp_dir.path().join("corpus");
    let data_dir = temp_dir.path().join("data");
    let results = temp_dir.path().join("results");
    write_corpus(&corpus_dir);

    Command::cargo_bin("gazemap")
        .unwrap()
        .arg("build")
        .arg("--quiet")
        .arg("--data-dir")
        .arg(&corpus_dir)
        .arg("--out")
        .arg(data_dir.join("capgaze1"))
        .assert()
        .success();

    let train_args = |extra: &[&str]| {
        let mut cmd = Command::cargo_bin("gazemap").unwrap();
        cmd.arg("train")
            .arg("--quiet")
            .arg("--dataset")
            .arg("capgaze1")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--epochs")
            .arg("1")
            .arg("--batch-size")
            .arg("2")
            .arg("--results-dir")
            .arg(&results);
        for arg in extra {
            cmd.arg(arg);
        }
        cmd
    };

    train_args(&["--save"]).assert().success();
    assert!(results.join("saved_model_baseline.safetensors").is_file());

    train_args(&["--load-model"]).assert().success();
}

#[test]
fn test_multimodal_training_runs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let corpus_dir = temp_dir.path().join("corpus");
    let data_dir = temp_dir.path().join("data");
    let results = temp_dir.path().join("results");
    write_corpus(&corpus_dir);

    Command::cargo_bin("gazemap")
        .unwrap()
        .arg("build")
        .arg("--quiet")
        .arg("--data-dir")
        .arg(&corpus_dir)
        .arg("--out")
        .arg(data_dir.join("capgaze1"))
        .assert()
        .success();

    Command::cargo_bin("gazemap")
        .unwrap()
        .arg("train")
        .arg("--quiet")
        .arg("--model")
        .arg("multimodal")
        .arg("--dataset")
        .arg("capgaze1")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--epochs")
        .arg("1")
        .arg("--batch-size")
        .arg("2")
        .arg("--results-dir")
        .arg(&results)
        .assert()
        .success();

    let history = parse_history(&results);
    assert_eq!(history["val_loss"].as_array().map(Vec::len), Some(1));
}
