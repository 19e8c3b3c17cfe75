//! Build command - assemble a sample store from a corpus.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gazemap_adapters::{FsCorpus, HashedBowEmbedder, SampleStoreWriter};
use gazemap_core::{BuildOptions, BuildStats, DatasetBuilder, SaliencyConfig, DEFAULT_SEED};
use tracing::info;

use crate::config::AppConfig;
use crate::output::ProgressBar;

/// Parse and validate a positive sigma value.
fn parse_sigma(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} is not positive"))
    }
}

/// Arguments for the build command.
#[derive(Args, Clone)]
pub struct BuildArgs {
    /// Corpus root directory (images/, transcribed_text/, gaze/)
    #[arg(long, value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Output store directory
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Caption-sampler seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Gaussian smoothing sigma in pixels
    #[arg(long, value_parser = parse_sigma, allow_hyphen_values = true)]
    pub sigma: Option<f32>,

    /// Cap the number of images processed
    #[arg(long)]
    pub limit: Option<usize>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl BuildArgs {
    /// Apply configuration file values, respecting CLI precedence.
    #[must_use]
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        args.seed = args.seed.or(config.build.seed);
        args.sigma = args.sigma.or(config.build.sigma);
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }
        args.config = Some(config.clone());
        args
    }

    fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    fn saliency_config(&self) -> SaliencyConfig {
        let mut config = SaliencyConfig::default();
        if let Some(sigma) = self.sigma {
            config.sigma = sigma;
        }
        config
    }
}

/// Run the build command.
pub fn run(args: &BuildArgs) -> Result<BuildStats> {
    info!(
        "Building dataset from {} into {}",
        args.data_dir.display(),
        args.out.display()
    );

    let corpus = FsCorpus::new(&args.data_dir);
    let embedder = HashedBowEmbedder::new();
    let options = BuildOptions {
        saliency: args.saliency_config(),
        seed: args.seed(),
        limit: args.limit,
    };
    let builder = DatasetBuilder::new(&corpus, &embedder, options)?;

    let mut writer = SampleStoreWriter::create(&args.out)?;

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(None, args.quiet, show_progress);

    let stats = builder.run(&mut writer, &progress)?;
    info!(
        "Wrote {} samples to {} ({} skipped)",
        stats.processed,
        args.out.display(),
        stats.skipped
    );
    Ok(stats)
}
