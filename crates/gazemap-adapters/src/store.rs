//! Compressed, random-access sample store.
//!
//! One gzip-compressed safetensors record per sample plus a JSON manifest:
//!
//! ```text
//! <store>/manifest.json
//! <store>/samples/000000.safetensors.gz
//! <store>/samples/000001.safetensors.gz
//! ```
//!
//! Writing is append-only and finalized by the manifest; the persisted
//! store is random-access by index.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use gazemap_core::{Sample, SampleSink, SampleSource, EMBED_DIM, INPUT_SIZE};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MANIFEST_FILE: &str = "manifest.json";
const SAMPLES_DIR: &str = "samples";
const MANIFEST_VERSION: u32 = 1;

/// Tensor names inside each record.
const IMAGE_TENSOR: &str = "image";
const CAPTION_TENSOR: &str = "caption";
const SALIENCY_TENSOR: &str = "saliency";

/// Store metadata, written once when the writer finishes.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    count: usize,
    image_shape: Vec<usize>,
    caption_shape: Vec<usize>,
    saliency_shape: Vec<usize>,
}

impl Manifest {
    fn new(count: usize) -> Self {
        Self {
            version: MANIFEST_VERSION,
            count,
            image_shape: vec![3, INPUT_SIZE, INPUT_SIZE],
            caption_shape: vec![EMBED_DIM],
            saliency_shape: vec![INPUT_SIZE, INPUT_SIZE],
        }
    }
}

fn record_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(SAMPLES_DIR).join(format!("{index:06}.safetensors.gz"))
}

/// Append-only writer for a new sample store.
pub struct SampleStoreWriter {
    dir: PathBuf,
    count: usize,
    finished: bool,
}

impl SampleStoreWriter {
    /// Creates the store directory structure.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join(SAMPLES_DIR))
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;
        Ok(Self {
            dir,
            count: 0,
            finished: false,
        })
    }

    /// Samples written so far.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

impl SampleSink for SampleStoreWriter {
    fn append(&mut self, sample: &Sample) -> Result<()> {
        anyhow::ensure!(!self.finished, "store already finalized");

        let tensors = HashMap::from([
            (
                IMAGE_TENSOR.to_string(),
                TensorView::new(
                    Dtype::F32,
                    vec![3, INPUT_SIZE, INPUT_SIZE],
                    bytemuck::cast_slice(&sample.image),
                )?,
            ),
            (
                CAPTION_TENSOR.to_string(),
                TensorView::new(
                    Dtype::F32,
                    vec![EMBED_DIM],
                    bytemuck::cast_slice(&sample.caption),
                )?,
            ),
            (
                SALIENCY_TENSOR.to_string(),
                TensorView::new(
                    Dtype::F32,
                    vec![INPUT_SIZE, INPUT_SIZE],
                    bytemuck::cast_slice(&sample.saliency),
                )?,
            ),
        ]);
        let serialized =
            safetensors::serialize(&tensors, &None).context("Failed to serialize sample")?;

        let path = record_path(&self.dir, self.count);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create record: {}", path.display()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(&serialized)
            .with_context(|| format!("Failed to write record: {}", path.display()))?;
        encoder
            .finish()
            .with_context(|| format!("Failed to finish record: {}", path.display()))?;

        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let manifest = Manifest::new(self.count);
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(self.dir.join(MANIFEST_FILE), json)
            .with_context(|| format!("Failed to write manifest in {}", self.dir.display()))?;
        self.finished = true;
        debug!("Finalized store with {} samples", self.count);
        Ok(())
    }
}

/// Random-access reader over a finalized sample store.
pub struct SampleStore {
    dir: PathBuf,
    count: usize,
}

impl SampleStore {
    /// Opens a finalized store.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is missing, unreadable, or has an
    /// unsupported version.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let manifest_path = dir.join(MANIFEST_FILE);
        let json = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))?;
        let manifest: Manifest = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse manifest: {}", manifest_path.display()))?;
        anyhow::ensure!(
            manifest.version == MANIFEST_VERSION,
            "Unsupported store version {} in {}",
            manifest.version,
            manifest_path.display()
        );
        Ok(Self {
            dir,
            count: manifest.count,
        })
    }

    /// Returns true if `dir` contains a finalized store.
    #[must_use]
    pub fn is_store(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }
}

impl SampleSource for SampleStore {
    fn len(&self) -> usize {
        self.count
    }

    fn get(&self, index: usize) -> Result<Sample> {
        anyhow::ensure!(
            index < self.count,
            "sample index {index} out of range (store holds {})",
            self.count
        );

        let path = record_path(&self.dir, index);
        let file = File::open(&path)
            .with_context(|| format!("Failed to open record: {}", path.display()))?;
        let mut decoder = GzDecoder::new(file);
        let mut bytes = Vec::new();
        decoder
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to decompress record: {}", path.display()))?;

        let tensors = SafeTensors::deserialize(&bytes)
            .with_context(|| format!("Failed to parse record: {}", path.display()))?;
        let image = tensor_f32(&tensors, IMAGE_TENSOR, &path)?;
        let caption = tensor_f32(&tensors, CAPTION_TENSOR, &path)?;
        let saliency = tensor_f32(&tensors, SALIENCY_TENSOR, &path)?;

        Sample::new(image, caption, saliency).map_err(Into::into)
    }
}

/// Extracts a named f32 tensor from a record.
fn tensor_f32(tensors: &SafeTensors, name: &str, path: &Path) -> Result<Vec<f32>> {
    let view = tensors
        .tensor(name)
        .with_context(|| format!("Missing tensor '{name}' in {}", path.display()))?;
    anyhow::ensure!(
        view.dtype() == Dtype::F32,
        "Tensor '{name}' in {} has dtype {:?}, expected F32",
        path.display(),
        view.dtype()
    );
    // Record bytes are little-endian; the buffer offset may be unaligned,
    // so decode per element instead of casting the slice.
    let data = view.data();
    anyhow::ensure!(
        data.len() % 4 == 0,
        "Tensor '{name}' in {} has truncated data",
        path.display()
    );
    Ok(data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gazemap_core::{IMAGE_LEN, MAP_LEN};

    fn sample(fill: f32) -> Sample {
        Sample::new(
            vec![fill; IMAGE_LEN],
            vec![fill * 2.0; EMBED_DIM],
            vec![fill * 3.0; MAP_LEN],
        )
        .unwrap()
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");

        let mut writer = SampleStoreWriter::create(&store_dir).unwrap();
        writer.append(&sample(0.1)).unwrap();
        writer.append(&sample(0.2)).unwrap();
        writer.finish().unwrap();

        let store = SampleStore::open(&store_dir).unwrap();
        assert_eq!(store.len(), 2);

        let restored = store.get(1).unwrap();
        assert!((restored.image[0] - 0.2).abs() < 1e-6);
        assert!((restored.caption[0] - 0.4).abs() < 1e-6);
        assert!((restored.saliency[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_open_requires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SampleStore::open(dir.path()).is_err());
        assert!(!SampleStore::is_store(dir.path()));
    }

    #[test]
    fn test_get_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");

        let mut writer = SampleStoreWriter::create(&store_dir).unwrap();
        writer.append(&sample(0.5)).unwrap();
        writer.finish().unwrap();

        let store = SampleStore::open(&store_dir).unwrap();
        assert!(store.get(1).is_err());
    }

    #[test]
    fn test_append_after_finish_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SampleStoreWriter::create(dir.path().join("store")).unwrap();
        writer.finish().unwrap();
        assert!(writer.append(&sample(0.1)).is_err());
    }

    #[test]
    fn test_records_are_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");

        let mut writer = SampleStoreWriter::create(&store_dir).unwrap();
        writer.append(&sample(0.0)).unwrap();
        writer.finish().unwrap();

        // A constant-filled record compresses far below its raw size.
        let raw_bytes = (IMAGE_LEN + EMBED_DIM + MAP_LEN) * 4;
        let on_disk = std::fs::metadata(record_path(&store_dir, 0)).unwrap().len();
        assert!((on_disk as usize) < raw_bytes / 10);
    }
}
