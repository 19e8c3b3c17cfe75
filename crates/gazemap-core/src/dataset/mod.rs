//! Dataset assembly: turning a raw corpus into persisted samples.

use anyhow::{Context, Result};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info, warn};

use crate::domain::{merge_sessions, Sample, EMBED_DIM, SESSIONS_PER_IMAGE};
use crate::error::CoreError;
use crate::ports::{CorpusSource, EmbeddingProvider, ProgressEvent, ProgressSink, SampleSink};
use crate::saliency::{SaliencyConfig, SaliencyMap};

/// Default seed for the caption-sampling generator.
pub const DEFAULT_SEED: u64 = 61;

/// Options for a dataset build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Saliency-map construction parameters.
    pub saliency: SaliencyConfig,
    /// Seed for the caption sampler.
    pub seed: u64,
    /// Optional cap on the number of images processed.
    pub limit: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            saliency: SaliencyConfig::default(),
            seed: DEFAULT_SEED,
            limit: None,
        }
    }
}

/// Outcome counts of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Samples written to the store.
    pub processed: usize,
    /// Images skipped as corrupt input.
    pub skipped: usize,
}

/// Picks the 1-based session whose transcription will be embedded.
pub fn sample_session<R: Rng>(rng: &mut R) -> usize {
    rng.gen_range(1..=SESSIONS_PER_IMAGE)
}

/// Assembles (image, caption embedding, saliency map) samples from a corpus.
pub struct DatasetBuilder<'a> {
    corpus: &'a dyn CorpusSource,
    embedder: &'a dyn EmbeddingProvider,
    options: BuildOptions,
}

impl<'a> std::fmt::Debug for DatasetBuilder<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetBuilder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> DatasetBuilder<'a> {
    /// Creates a builder over a corpus and an embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmbeddingDim`] if the provider does not produce
    /// 768-dimensional vectors.
    pub fn new(
        corpus: &'a dyn CorpusSource,
        embedder: &'a dyn EmbeddingProvider,
        options: BuildOptions,
    ) -> Result<Self, CoreError> {
        if embedder.dimensions() != EMBED_DIM {
            return Err(CoreError::EmbeddingDim {
                model_id: embedder.model_id().to_string(),
                expected: EMBED_DIM,
                actual: embedder.dimensions(),
            });
        }
        Ok(Self {
            corpus,
            embedder,
            options,
        })
    }

    /// Drains the corpus into `sink`, one sample per usable image.
    ///
    /// Images whose fixation data yields a flat saliency map are corrupt
    /// input: they are skipped with a warning. Any other failure aborts
    /// the run.
    ///
    /// # Errors
    ///
    /// Returns an error on any I/O, decode, or embedding failure.
    pub fn run(
        &self,
        sink: &mut dyn SampleSink,
        progress: &dyn ProgressSink,
    ) -> Result<BuildStats> {
        use rand::SeedableRng;
        let mut rng = ChaCha20Rng::seed_from_u64(self.options.seed);

        let mut ids = self.corpus.ids().context("Failed to enumerate corpus")?;
        if let Some(limit) = self.options.limit {
            ids.truncate(limit);
        }
        info!(
            "Building dataset: {} images, embedder '{}'",
            ids.len(),
            self.embedder.model_id()
        );

        let total = ids.len();
        let mut processed = 0usize;
        let mut skipped = 0usize;

        for (index, id) in ids.iter().enumerate() {
            progress.on_event(ProgressEvent::Started {
                id: id.clone(),
                index,
                total: Some(total),
            });

            match self.build_one(id, &mut rng)? {
                Some(sample) => {
                    sink.append(&sample)
                        .with_context(|| format!("Failed to store sample for '{id}'"))?;
                    progress.on_event(ProgressEvent::Completed { id: id.clone() });
                    processed += 1;
                }
                None => {
                    skipped += 1;
                    progress.on_event(ProgressEvent::Skipped {
                        id: id.clone(),
                        reason: "flat saliency map (no in-bounds fixations)".to_string(),
                    });
                }
            }
        }

        sink.finish().context("Failed to finalize sample store")?;
        progress.on_event(ProgressEvent::Finished { processed, skipped });
        info!("Dataset build finished: {processed} samples, {skipped} skipped");

        Ok(BuildStats { processed, skipped })
    }

    /// Builds the sample for one image; `Ok(None)` marks corrupt input.
    fn build_one(&self, id: &str, rng: &mut ChaCha20Rng) -> Result<Option<Sample>> {
        let image = self
            .corpus
            .image(id)
            .with_context(|| format!("Failed to load image '{id}'"))?;

        let records = self
            .corpus
            .gaze(id)
            .with_context(|| format!("Failed to load gaze records for '{id}'"))?;
        let merged = merge_sessions(&records);

        let map = match SaliencyMap::from_fixations(
            &merged,
            image.orig_height,
            image.orig_width,
            &self.options.saliency,
        ) {
            Ok(map) => map,
            Err(CoreError::FlatMap { in_bounds }) => {
                warn!("Skipping '{id}': flat saliency map ({in_bounds} in-bounds fixations)");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let session = sample_session(rng);
        let text = self
            .corpus
            .caption(id, session)
            .with_context(|| format!("Failed to load caption {session} for '{id}'"))?;
        debug!("Embedding caption for '{id}' (session {session})");
        let embedding = self
            .embedder
            .embed(&text)
            .with_context(|| format!("Failed to embed caption for '{id}'"))?;
        if embedding.len() != EMBED_DIM {
            return Err(CoreError::EmbeddingDim {
                model_id: self.embedder.model_id().to_string(),
                expected: EMBED_DIM,
                actual: embedding.len(),
            }
            .into());
        }

        let sample = Sample::new(
            image.pixels,
            embedding,
            map.to_model_input().into_data(),
        )?;
        Ok(Some(sample))
    }
}
