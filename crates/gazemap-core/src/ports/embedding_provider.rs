//! Embedding provider port for caption-to-vector conversion.
//!
//! The pipeline never talks to a language model directly; it embeds
//! captions through this seam. Adapters supply the implementation — a
//! deterministic hashed bag-of-words by default, or any external encoder.

/// Port for turning caption text into a fixed-length vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a caption into a vector of [`dimensions`](Self::dimensions)
    /// elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to produce an embedding.
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Dimensionality of the vectors this provider produces.
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model, for logging and provenance.
    fn model_id(&self) -> &str;
}
