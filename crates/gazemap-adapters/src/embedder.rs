//! Default caption embedding provider.
//!
//! A deterministic hashed bag-of-words embedder: every token is hashed
//! into a signed bucket of a fixed-length vector, which is then
//! L2-normalized. It stands in for an external sentence encoder behind the
//! [`EmbeddingProvider`] port — useful for reproducible dataset builds and
//! tests, and replaceable without touching the pipeline.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::Result;
use gazemap_core::{EmbeddingProvider, EMBED_DIM};

/// Seed mixed into every token hash so embeddings are stable but
/// distinguishable from plain `DefaultHasher` output.
const HASH_SEED: u64 = 0x6761_7a65_6d61_7001;

/// Deterministic hashed bag-of-words embedding provider.
pub struct HashedBowEmbedder {
    dims: usize,
}

impl HashedBowEmbedder {
    /// Creates a provider producing 768-dimensional embeddings.
    #[must_use]
    pub const fn new() -> Self {
        Self { dims: EMBED_DIM }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        HASH_SEED.hash(&mut hasher);
        token.hash(&mut hasher);
        let hash = hasher.finish();
        let index = (hash % self.dims as u64) as usize;
        let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashedBowEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for HashedBowEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let (index, sign) = self.bucket(&token.to_lowercase());
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_id(&self) -> &str {
        "hashed-bow-768"
    }
}
