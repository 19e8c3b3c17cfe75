//! Filesystem adapter for the gaze/caption/image corpus layout.
//!
//! Expected tree under the corpus root:
//!
//! ```text
//! images/<id>.jpg
//! transcribed_text/<session>/<id>.json   (field "text")
//! gaze/<session>/<id>.json               (dominant_eye / left_eye / right_eye)
//! ```
//!
//! Sessions are numbered 1 through 5. Image ids are file stems.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gazemap_core::domain::SESSIONS_PER_IMAGE;
use image::GenericImageView;
use gazemap_core::{CorpusSource, GazeRecord, ImageRecord, INPUT_SIZE};
use serde::Deserialize;
use tracing::{debug, warn};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Per-channel means subtracted after the RGB→BGR swap (ImageNet, BGR order).
const VGG_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// A caption transcription file.
#[derive(Debug, Deserialize)]
struct CaptionFile {
    text: String,
}

/// Filesystem corpus adapter.
pub struct FsCorpus {
    root: PathBuf,
}

impl FsCorpus {
    /// Creates a corpus over the given root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The corpus root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    fn gaze_path(&self, session: usize, id: &str) -> PathBuf {
        self.root
            .join("gaze")
            .join(session.to_string())
            .join(format!("{id}.json"))
    }

    fn caption_path(&self, session: usize, id: &str) -> PathBuf {
        self.root
            .join("transcribed_text")
            .join(session.to_string())
            .join(format!("{id}.json"))
    }

    fn image_path(&self, id: &str) -> Result<PathBuf> {
        for ext in IMAGE_EXTENSIONS {
            let path = self.images_dir().join(format!("{id}.{ext}"));
            if path.exists() {
                return Ok(path);
            }
        }
        anyhow::bail!(
            "No image file for '{id}' under {}",
            self.images_dir().display()
        )
    }
}

impl CorpusSource for FsCorpus {
    fn ids(&self) -> Result<Vec<String>> {
        let dir = self.images_dir();
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read images directory: {}", dir.display()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
            if !supported {
                warn!("Ignoring non-image file: {}", path.display());
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        // Directory order is platform-dependent; a stable order keeps the
        // seeded caption sampler reproducible across runs.
        ids.sort();
        debug!("Found {} corpus images", ids.len());
        Ok(ids)
    }

    fn image(&self, id: &str) -> Result<ImageRecord> {
        let path = self.image_path(id)?;
        let decoded = image::open(&path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;

        let (orig_width, orig_height) = decoded.dimensions();
        let (orig_width, orig_height) = (orig_width as usize, orig_height as usize);

        let resized = decoded.resize_exact(
            INPUT_SIZE as u32,
            INPUT_SIZE as u32,
            image::imageops::FilterType::Triangle,
        );
        let rgb = resized.to_rgb8();

        // VGG preprocessing: channel-first BGR with ImageNet means removed.
        let mut pixels = vec![0.0f32; 3 * INPUT_SIZE * INPUT_SIZE];
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let spatial = y as usize * INPUT_SIZE + x as usize;
            for (channel, &rgb_index) in [2usize, 1, 0].iter().enumerate() {
                pixels[channel * INPUT_SIZE * INPUT_SIZE + spatial] =
                    f32::from(pixel.0[rgb_index]) - VGG_MEAN_BGR[channel];
            }
        }

        Ok(ImageRecord {
            pixels,
            orig_height,
            orig_width,
        })
    }

    fn gaze(&self, id: &str) -> Result<Vec<GazeRecord>> {
        let mut records = Vec::with_capacity(SESSIONS_PER_IMAGE);
        for session in 1..=SESSIONS_PER_IMAGE {
            let path = self.gaze_path(session, id);
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read gaze record: {}", path.display()))?;
            let record: GazeRecord = serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse gaze record: {}", path.display()))?;
            records.push(record);
        }
        Ok(records)
    }

    fn caption(&self, id: &str, session: usize) -> Result<String> {
        let path = self.caption_path(session, id);
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read caption: {}", path.display()))?;
        let caption: CaptionFile = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse caption: {}", path.display()))?;
        Ok(caption.text)
    }
}
