//! Corpus source port: raw inputs the dataset builder consumes.

use crate::domain::{GazeRecord, ImageRecord};

/// Port for reading a gaze/caption/image corpus.
///
/// The filesystem adapter implements this over the on-disk layout
/// (`images/`, `transcribed_text/`, `gaze/`); tests use in-memory mocks.
pub trait CorpusSource: Send + Sync {
    /// Enumerates the image identifiers in the corpus.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus cannot be listed.
    fn ids(&self) -> anyhow::Result<Vec<String>>;

    /// Loads and preprocesses an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is missing or cannot be decoded.
    fn image(&self, id: &str) -> anyhow::Result<ImageRecord>;

    /// Loads all gaze-tracking sessions for an image, in session order.
    ///
    /// A missing session file is a hard error.
    ///
    /// # Errors
    ///
    /// Returns an error if any session record is missing or malformed.
    fn gaze(&self, id: &str) -> anyhow::Result<Vec<GazeRecord>>;

    /// Loads the caption transcribed in the given session (1-based).
    ///
    /// # Errors
    ///
    /// Returns an error if the caption file is missing or malformed.
    fn caption(&self, id: &str, session: usize) -> anyhow::Result<String>;
}
