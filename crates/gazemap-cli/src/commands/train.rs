//! Train command - run the epoch loop over a sample store.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use candle_core::DType;
use candle_nn::{VarBuilder, VarMap};
use clap::{Args, ValueEnum};
use gazemap_adapters::{encoder_weights_path, load_weights, set_models_dir, SampleStore};
use gazemap_core::models::{apply_pretrained, get_device, trainable_vars};
use gazemap_core::{
    ExponentialDecay, ModelKind, OptimizerKind, SampleSource, TrainOptions, Trainer,
    TrainingHistory,
};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::output::ProgressBar;

/// Model variant selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ModelArg {
    /// Image-only model.
    #[default]
    Baseline,
    /// Image + caption model.
    Multimodal,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Baseline => Self::Baseline,
            ModelArg::Multimodal => Self::Multimodal,
        }
    }
}

impl ModelArg {
    const fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Multimodal => "multimodal",
        }
    }
}

/// Optimizer selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OptimArg {
    /// Adam.
    #[default]
    Adam,
    /// AdamW with decoupled weight decay.
    Adamw,
    /// Stochastic gradient descent.
    Sgd,
}

impl From<OptimArg> for OptimizerKind {
    fn from(arg: OptimArg) -> Self {
        match arg {
            OptimArg::Adam => Self::Adam,
            OptimArg::Adamw => Self::AdamW,
            OptimArg::Sgd => Self::Sgd,
        }
    }
}

/// Hardcoded defaults for training options.
mod defaults {
    pub const LR: f64 = 1e-4;
    pub const EPOCHS: usize = 24;
    pub const BATCH_SIZE: usize = 32;
    pub const STEP_SIZE: usize = 5;
    pub const DECAY_RATE: f64 = 0.1;
}

/// Arguments for the train command.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct TrainArgs {
    /// Dataset name: a store directory under the data directory. A store
    /// with train/ and val/ subdirectories trains and validates; a flat
    /// store runs validate-only epochs.
    #[arg(long, default_value = "capgaze1")]
    pub dataset: String,

    /// Directory containing dataset stores
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Model variant
    #[arg(long, value_enum, default_value_t = ModelArg::Baseline)]
    pub model: ModelArg,

    /// Save a checkpoint after every epoch
    #[arg(long)]
    pub save: bool,

    /// Load the saved checkpoint before running
    #[arg(long)]
    pub load_model: bool,

    /// Load pretrained encoder weights when available
    #[arg(long)]
    pub use_pretrained: bool,

    /// Also update pretrained encoder weights during training
    #[arg(long)]
    pub fine_tune: bool,

    /// Initial learning rate
    #[arg(long)]
    pub lr: Option<f64>,

    /// Enable exponential learning-rate decay
    #[arg(long)]
    pub lr_sched: bool,

    /// Decay period in optimizer steps
    #[arg(long)]
    pub step_size: Option<usize>,

    /// Decay factor per period
    #[arg(long)]
    pub decay_rate: Option<f64>,

    /// Optimizer
    #[arg(long, value_enum)]
    pub optim: Option<OptimArg>,

    /// L1 regularization strength
    #[arg(long)]
    pub l1: Option<f64>,

    /// L2 regularization strength
    #[arg(long)]
    pub l2: Option<f64>,

    /// Number of epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Directory for checkpoints and history files
    #[arg(long, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Batch-shuffle seed
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl TrainArgs {
    /// Apply configuration file values, respecting CLI precedence.
    #[must_use]
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        args.lr = args.lr.or(config.train.lr);
        args.epochs = args.epochs.or(config.train.epochs);
        args.batch_size = args.batch_size.or(config.train.batch_size);
        if args.optim.is_none() {
            args.optim = config
                .train
                .optim
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "adam" => Some(OptimArg::Adam),
                    "adamw" => Some(OptimArg::Adamw),
                    "sgd" => Some(OptimArg::Sgd),
                    _ => None,
                });
        }
        if args.results_dir.is_none() {
            args.results_dir.clone_from(&config.train.results_dir);
        }
        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.train.models_dir);
        }
        args.config = Some(config.clone());
        args
    }

    fn lr(&self) -> f64 {
        self.lr.unwrap_or(defaults::LR)
    }

    fn epochs(&self) -> usize {
        self.epochs.unwrap_or(defaults::EPOCHS)
    }

    fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(defaults::BATCH_SIZE)
    }

    fn results_dir(&self) -> PathBuf {
        self.results_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("results"))
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.results_dir()
            .join(format!("saved_model_{}.safetensors", self.model.name()))
    }

    fn train_options(&self) -> TrainOptions {
        TrainOptions {
            epochs: self.epochs(),
            batch_size: self.batch_size(),
            lr: self.lr(),
            optimizer: self.optim.unwrap_or_default().into(),
            schedule: self.lr_sched.then(|| ExponentialDecay {
                decay_steps: self.step_size.unwrap_or(defaults::STEP_SIZE),
                decay_rate: self.decay_rate.unwrap_or(defaults::DECAY_RATE),
            }),
            l1: self.l1,
            l2: self.l2,
            shuffle_seed: self.seed,
            checkpoint: self.save.then(|| self.checkpoint_path()),
        }
    }
}

/// Result of running the train command.
pub struct TrainResult {
    /// Epochs executed.
    pub epochs: usize,
    /// Where the metric history was written.
    pub history_path: PathBuf,
}

/// Run the train command.
///
/// Expects `args` to have been processed through `with_config()` first.
pub fn run(args: &TrainArgs) -> Result<TrainResult> {
    let dataset_dir = args.data_dir.join(&args.dataset);
    let (train_store, val_store) = open_stores(&dataset_dir)?;
    info!(
        "Data: {} ({})",
        args.dataset,
        if train_store.is_some() {
            "train/val splits"
        } else {
            "validate-only"
        }
    );
    info!("Model: {}", args.model.name());

    if let Some(ref models_dir) = args.models_dir {
        debug!("Using custom models directory: {}", models_dir.display());
        set_models_dir(Some(models_dir.clone()));
    }

    let device = get_device();
    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = ModelKind::from(args.model).build(&vb)?;

    let mut pretrained_applied = false;
    if args.use_pretrained {
        let path = encoder_weights_path();
        if path.exists() {
            let weights = load_weights(&path, &device)?;
            let applied = apply_pretrained(&varmap, &weights)?;
            pretrained_applied = applied > 0;
        } else {
            info!(
                "Pretrained weights not found at {}; training from scratch",
                path.display()
            );
        }
    }

    if args.load_model {
        let path = args.checkpoint_path();
        varmap
            .load(&path)
            .with_context(|| format!("Failed to load checkpoint: {}", path.display()))?;
        info!("Loaded checkpoint from {}", path.display());
    }

    // With pretrained weights in place, the encoder stays frozen unless
    // fine-tuning is requested. A from-scratch encoder always trains.
    let fine_tune = args.fine_tune || !pretrained_applied;
    let trainable = trainable_vars(&varmap, fine_tune)?;

    let results_dir = args.results_dir();
    std::fs::create_dir_all(&results_dir)
        .with_context(|| format!("Failed to create results dir: {}", results_dir.display()))?;

    let options = args.train_options();
    let epochs = options.epochs;
    let trainer = Trainer::new(device, options);

    let show_progress = !args.quiet && std::io::stderr().is_terminal();
    let progress = ProgressBar::new(None, args.quiet, show_progress);

    let mut history = TrainingHistory::new();
    trainer.fit(
        model.as_ref(),
        &varmap,
        trainable,
        train_store.as_ref().map(|s| s as &dyn SampleSource),
        &val_store,
        &mut history,
        &progress,
    )?;

    let config_name = format!("{}_{}_{}", args.model.name(), args.dataset, timestamp());
    let history_path = results_dir.join(format!("history_{config_name}.json"));
    history.save(&history_path)?;
    info!("History written to {}", history_path.display());

    Ok(TrainResult {
        epochs,
        history_path,
    })
}

/// Opens the dataset: split stores when train/ and val/ exist, otherwise a
/// flat validate-only store.
fn open_stores(dataset_dir: &std::path::Path) -> Result<(Option<SampleStore>, SampleStore)> {
    let train_dir = dataset_dir.join("train");
    let val_dir = dataset_dir.join("val");

    if SampleStore::is_store(&train_dir) && SampleStore::is_store(&val_dir) {
        return Ok((
            Some(SampleStore::open(&train_dir)?),
            SampleStore::open(&val_dir)?,
        ));
    }
    if SampleStore::is_store(dataset_dir) {
        return Ok((None, SampleStore::open(dataset_dir)?));
    }
    anyhow::bail!(
        "No sample store found at {} (expected a manifest, or train/ and val/ subdirectories)",
        dataset_dir.display()
    )
}

/// Filename-safe UTC timestamp.
fn timestamp() -> String {
    let format = time::macros::format_description!(
        "[year][month][day]-[hour][minute][second]"
    );
    match time::OffsetDateTime::now_utc().format(&format) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("19700101-000000")
        }
    }
}
