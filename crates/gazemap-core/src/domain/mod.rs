//! Domain types for the saliency pipeline.

mod fixation;
mod history;
mod sample;

pub use fixation::{
    merge_sessions, DominantEye, GazePoint, GazeRecord, SESSIONS_PER_IMAGE,
};
pub use history::{Metric, Split, TrainingHistory};
pub use sample::{ImageRecord, Sample, CHANNELS, EMBED_DIM, IMAGE_LEN, INPUT_SIZE, MAP_LEN};
