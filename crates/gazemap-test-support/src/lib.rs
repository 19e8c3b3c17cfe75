//! Test support utilities for gazemap.
//!
//! Provides mocks for the core ports and synthetic corpus builders used by
//! unit and integration tests across the workspace.
//!
//! # Example
//!
//! ```
//! use gazemap_test_support::{fixation_cluster, SyntheticCorpus};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let corpus = SyntheticCorpus::new(dir.path());
//! corpus
//!     .add_image("img1", 320, 240, &fixation_cluster(0.5, 0.5, 80))
//!     .unwrap();
//! ```

mod builders;
mod mocks;

pub use builders::{fixation_cluster, SyntheticCorpus};
pub use mocks::{MockEmbeddingProvider, MockProgressSink, MockSampleSink, MockSampleSource};
