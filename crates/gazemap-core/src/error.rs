//! Typed errors for conditions callers must distinguish.

use thiserror::Error;

/// Result alias for core operations with typed failures.
pub type CoreResult<T> = Result<T, CoreError>;

/// Core pipeline errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Min-max normalization was degenerate: the blurred grid had no value
    /// range (no in-bounds fixation landed, or the grid saturated). The
    /// sample should be treated as corrupt input rather than silently
    /// producing NaN.
    #[error("saliency map is flat ({in_bounds} in-bounds fixations); cannot normalize")]
    FlatMap {
        /// How many fixations landed inside the grid.
        in_bounds: usize,
    },

    /// A tensor buffer had the wrong number of elements.
    #[error("{field} has {actual} elements, expected {expected}")]
    Shape {
        /// Which buffer was malformed.
        field: &'static str,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// An embedding provider returned a vector of the wrong dimensionality.
    #[error("embedding provider '{model_id}' returned {actual} dims, expected {expected}")]
    EmbeddingDim {
        /// Provider identifier.
        model_id: String,
        /// Expected dimensionality.
        expected: usize,
        /// Actual dimensionality.
        actual: usize,
    },
}
