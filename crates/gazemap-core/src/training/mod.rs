//! Training loop and learning-rate schedules.

mod schedule;
mod trainer;

pub use schedule::ExponentialDecay;
pub use trainer::{OptimizerKind, TrainOptions, Trainer};
