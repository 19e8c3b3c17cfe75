//! Synthetic corpus builders for on-disk pipeline tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gazemap_core::domain::SESSIONS_PER_IMAGE;

/// Writes a gaze/caption/image corpus tree with controllable fixations.
///
/// Fixations are spread round-robin over the five sessions, always into
/// the dominant-eye stream; the non-dominant stream receives a decoy point
/// so tests can catch accidental use of the wrong stream.
pub struct SyntheticCorpus {
    root: PathBuf,
}

impl SyntheticCorpus {
    /// Creates a builder rooted at `root` (typically a temp dir).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The corpus root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Adds one image with its gaze sessions and captions.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written.
    pub fn add_image(
        &self,
        id: &str,
        width: u32,
        height: u32,
        fixations: &[(f32, f32)],
    ) -> Result<()> {
        self.write_image(id, width, height)?;
        self.write_gaze(id, fixations)?;
        self.write_captions(id)?;
        Ok(())
    }

    fn write_image(&self, id: &str, width: u32, height: u32) -> Result<()> {
        let dir = self.root.join("images");
        std::fs::create_dir_all(&dir)?;
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 96])
        });
        let path = dir.join(format!("{id}.jpg"));
        img.save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn write_gaze(&self, id: &str, fixations: &[(f32, f32)]) -> Result<()> {
        for session in 1..=SESSIONS_PER_IMAGE {
            let dir = self.root.join("gaze").join(session.to_string());
            std::fs::create_dir_all(&dir)?;

            // Round-robin split of the fixation list over sessions.
            let points: Vec<serde_json::Value> = fixations
                .iter()
                .enumerate()
                .filter(|(i, _)| i % SESSIONS_PER_IMAGE == session - 1)
                .map(|(_, &(x, y))| serde_json::json!([x, y]))
                .collect();
            let decoy = serde_json::json!([[0.05, 0.05]]);

            let dominant_left = session % 2 == 1;
            let record = serde_json::json!({
                "dominant_eye": u8::from(!dominant_left),
                "left_eye": if dominant_left { serde_json::json!(points) } else { decoy.clone() },
                "right_eye": if dominant_left { decoy } else { serde_json::json!(points) },
            });

            let path = dir.join(format!("{id}.json"));
            std::fs::write(&path, serde_json::to_string(&record)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }

    fn write_captions(&self, id: &str) -> Result<()> {
        for session in 1..=SESSIONS_PER_IMAGE {
            let dir = self.root.join("transcribed_text").join(session.to_string());
            std::fs::create_dir_all(&dir)?;
            let caption = serde_json::json!({
                "text": format!("session {session} description of {id}")
            });
            let path = dir.join(format!("{id}.json"));
            std::fs::write(&path, serde_json::to_string(&caption)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

/// A tight cluster of `count` fixations around `(cx, cy)`, with a small
/// deterministic jitter so points are distinct.
#[must_use]
pub fn fixation_cluster(cx: f32, cy: f32, count: usize) -> Vec<(f32, f32)> {
    (0..count)
        .map(|i| {
            let jitter = 0.002 * (i % 5) as f32;
            ((cx + jitter).min(0.999), (cy - jitter).max(0.001))
        })
        .collect()
}
