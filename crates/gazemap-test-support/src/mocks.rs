//! Mock implementations of core port traits.

use std::sync::{Arc, Mutex, PoisonError};

use gazemap_core::{
    EmbeddingProvider, ProgressEvent, ProgressSink, Sample, SampleSink, SampleSource, EMBED_DIM,
};

/// Mock embedding provider producing deterministic vectors.
///
/// The vector depends only on the caption text, so repeated runs over the
/// same corpus yield identical datasets. Embedded captions are recorded
/// for assertions.
pub struct MockEmbeddingProvider {
    dims: usize,
    captions: Arc<Mutex<Vec<String>>>,
}

impl MockEmbeddingProvider {
    /// Creates a provider with the standard 768 dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimensions(EMBED_DIM)
    }

    /// Creates a provider with custom (possibly wrong) dimensions.
    #[must_use]
    pub fn with_dimensions(dims: usize) -> Self {
        Self {
            dims,
            captions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Captions embedded so far, in call order.
    #[must_use]
    pub fn embedded_captions(&self) -> Vec<String> {
        self.captions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.captions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());

        let sum: u32 = text.bytes().map(u32::from).sum();
        Ok((0..self.dims)
            .map(|i| ((sum as usize + i) % 13) as f32 / 13.0)
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_id(&self) -> &str {
        "mock-embedder"
    }
}

/// Mock progress sink that records every event.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MockProgressSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Count of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// In-memory sample sink capturing appended samples.
#[derive(Default)]
pub struct MockSampleSink {
    /// Captured samples.
    pub samples: Vec<Sample>,
    /// Whether `finish` was called.
    pub finished: bool,
}

impl MockSampleSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleSink for MockSampleSink {
    fn append(&mut self, sample: &Sample) -> anyhow::Result<()> {
        self.samples.push(sample.clone());
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// In-memory sample source over pre-built samples.
pub struct MockSampleSource {
    samples: Vec<Sample>,
}

impl MockSampleSource {
    /// Creates a source over the given samples.
    #[must_use]
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl SampleSource for MockSampleSource {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> anyhow::Result<Sample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("sample index {index} out of range"))
    }
}
