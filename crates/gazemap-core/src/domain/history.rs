//! Per-epoch metric history.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Dataset split a metric was computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Training pass (gradient updates applied).
    Train,
    /// Validation pass (metrics only).
    Val,
}

impl Split {
    /// Key prefix used in the persisted history.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
        }
    }
}

/// Scalar metrics tracked per epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Mean loss over the epoch.
    Loss,
    /// Area under the ROC curve.
    Auc,
    /// Pearson correlation coefficient.
    Cc,
    /// Normalized scanpath saliency.
    Nss,
    /// KL divergence.
    KlDiv,
    /// Histogram similarity.
    Sim,
}

impl Metric {
    /// All tracked metrics, in recording order.
    pub const ALL: [Self; 6] = [
        Self::Loss,
        Self::Auc,
        Self::Cc,
        Self::Nss,
        Self::KlDiv,
        Self::Sim,
    ];

    /// Key suffix used in the persisted history.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Loss => "loss",
            Self::Auc => "auc",
            Self::Cc => "cc",
            Self::Nss => "nss",
            Self::KlDiv => "kldiv",
            Self::Sim => "sim",
        }
    }
}

/// Append-only record of per-epoch scalar metrics.
///
/// Keys are `{split}_{metric}` (e.g. `val_auc`); each maps to one value per
/// epoch, in epoch order. Written to disk once at the end of a run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingHistory {
    series: BTreeMap<String, Vec<f64>>,
}

impl TrainingHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one epoch value for a metric.
    pub fn record(&mut self, split: Split, metric: Metric, value: f64) {
        let key = format!("{}_{}", split.prefix(), metric.name());
        self.series.entry(key).or_default().push(value);
    }

    /// Returns the recorded values for a metric, if any epoch recorded it.
    #[must_use]
    pub fn get(&self, split: Split, metric: Metric) -> Option<&[f64]> {
        let key = format!("{}_{}", split.prefix(), metric.name());
        self.series.get(&key).map(Vec::as_slice)
    }

    /// Number of epochs recorded for the given split, 0 if none.
    #[must_use]
    pub fn epochs(&self, split: Split) -> usize {
        self.get(split, Metric::Loss).map_or(0, <[f64]>::len)
    }

    /// Returns true if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Writes the history as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize history")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write history: {}", path.display()))?;
        Ok(())
    }

    /// Reads a history back from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read history: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse history: {}", path.display()))
    }
}
