//! Gazemap Adapters - Filesystem and storage implementations of the core
//! ports: the on-disk corpus layout, the compressed sample store, the
//! default embedding provider, and pretrained-weight loading.

mod embedder;
mod fs;
mod store;
mod weights;

pub use embedder::HashedBowEmbedder;
pub use fs::FsCorpus;
pub use store::{SampleStore, SampleStoreWriter};
pub use weights::{
    encoder_weights_path, load_weights, models_dir, set_models_dir, ENCODER_WEIGHTS_FILE,
};
