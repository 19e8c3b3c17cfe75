//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external
//! adapters.

mod corpus;
mod embedding_provider;
mod progress;
mod samples;

pub use corpus::CorpusSource;
pub use embedding_provider::EmbeddingProvider;
pub use progress::{NullProgressSink, ProgressEvent, ProgressSink};
pub use samples::{SampleSink, SampleSource};
