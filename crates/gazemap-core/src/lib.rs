//! Gazemap Core - Domain logic for the saliency-prediction pipeline.
//!
//! This crate contains the domain types, saliency-map construction,
//! evaluation metrics, the Candle model variants, the train/validate loop,
//! and the ports adapters implement.

pub mod dataset;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod saliency;
pub mod training;

pub use dataset::{BuildOptions, BuildStats, DatasetBuilder, DEFAULT_SEED};
pub use domain::{
    GazePoint, GazeRecord, ImageRecord, Metric, Sample, Split, TrainingHistory, EMBED_DIM,
    IMAGE_LEN, INPUT_SIZE, MAP_LEN,
};
pub use error::{CoreError, CoreResult};
pub use models::{ModelKind, SaliencyModel};
pub use ports::{
    CorpusSource, EmbeddingProvider, NullProgressSink, ProgressEvent, ProgressSink, SampleSink,
    SampleSource,
};
pub use saliency::{SaliencyConfig, SaliencyMap, TrimPolicy};
pub use training::{ExponentialDecay, OptimizerKind, TrainOptions, Trainer};
