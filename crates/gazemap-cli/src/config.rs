//! Configuration file support for gazemap.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/gazemap/config.toml` (lowest priority)
//! - Project-local: `.gazemap.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dataset-build settings.
    pub build: BuildConfig,
    /// Training settings.
    pub train: TrainConfig,
    /// Output settings.
    pub output: OutputConfig,
}

/// Dataset-build configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Gaussian smoothing sigma in pixels.
    pub sigma: Option<f32>,
    /// Caption-sampler seed.
    pub seed: Option<u64>,
}

/// Training configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Initial learning rate.
    pub lr: Option<f64>,
    /// Number of epochs.
    pub epochs: Option<usize>,
    /// Batch size.
    pub batch_size: Option<usize>,
    /// Optimizer: "adam", "adamw" or "sgd".
    pub optim: Option<String>,
    /// Results directory.
    pub results_dir: Option<PathBuf>,
    /// Models directory for pretrained weights.
    pub models_dir: Option<PathBuf>,
}

/// Output configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/gazemap/config.toml`
    /// 2. Project-local: `.gazemap.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as
    /// warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(sigma) = self.build.sigma {
            if !(sigma > 0.0) {
                return Err(format!("build.sigma must be positive, got {sigma}"));
            }
        }
        if let Some(lr) = self.train.lr {
            if !(lr > 0.0) {
                return Err(format!("train.lr must be positive, got {lr}"));
            }
        }
        if let Some(batch) = self.train.batch_size {
            if batch == 0 {
                return Err("train.batch_size must be at least 1".to_string());
            }
        }
        if let Some(ref optim) = self.train.optim {
            if !["adam", "adamw", "sgd"].contains(&optim.as_str()) {
                return Err(format!(
                    "train.optim must be 'adam', 'adamw' or 'sgd', got '{optim}'"
                ));
            }
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    pub(crate) fn merge(&mut self, other: Self) {
        self.build.sigma = other.build.sigma.or(self.build.sigma);
        self.build.seed = other.build.seed.or(self.build.seed);

        self.train.lr = other.train.lr.or(self.train.lr);
        self.train.epochs = other.train.epochs.or(self.train.epochs);
        self.train.batch_size = other.train.batch_size.or(self.train.batch_size);
        self.train.optim = other.train.optim.or_else(|| self.train.optim.take());
        self.train.results_dir = other
            .train
            .results_dir
            .or_else(|| self.train.results_dir.take());
        self.train.models_dir = other
            .train
            .models_dir
            .or_else(|| self.train.models_dir.take());

        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gazemap").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.gazemap.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".gazemap.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
