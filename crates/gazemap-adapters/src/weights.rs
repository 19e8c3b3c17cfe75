//! Pretrained-weight resolution and loading.
//!
//! Checkpoints and pretrained encoder weights are safetensors files. The
//! default location is `<data-dir>/gazemap/models`, overridable per
//! process for tests and custom installs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use once_cell::sync::Lazy;
use safetensors::SafeTensors;
use tracing::debug;

/// File name of the pretrained encoder weights.
pub const ENCODER_WEIGHTS_FILE: &str = "encoder.safetensors";

static MODELS_DIR_OVERRIDE: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Overrides the models directory for this process.
pub fn set_models_dir(dir: Option<PathBuf>) {
    if let Ok(mut guard) = MODELS_DIR_OVERRIDE.lock() {
        *guard = dir;
    }
}

/// Returns the models directory.
///
/// Uses the process override if set, otherwise
/// `XDG_DATA_HOME/gazemap/models` or `~/.local/share/gazemap/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    if let Ok(guard) = MODELS_DIR_OVERRIDE.lock() {
        if let Some(dir) = guard.as_ref() {
            return dir.clone();
        }
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gazemap")
        .join("models")
}

/// Path where pretrained encoder weights are expected.
#[must_use]
pub fn encoder_weights_path() -> PathBuf {
    models_dir().join(ENCODER_WEIGHTS_FILE)
}

/// Loads all tensors from a safetensors file onto a device.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a tensor has
/// an unsupported dtype.
pub fn load_weights(path: &std::path::Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    debug!("Loading weights from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read weights file: {}", path.display()))?;
    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut map = HashMap::new();
    for name in tensors.names() {
        let view = tensors
            .tensor(name)
            .with_context(|| format!("Failed to get tensor '{name}'"))?;
        let dtype = safetensors_dtype_to_candle(view.dtype())?;
        let shape: Vec<usize> = view.shape().to_vec();
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, &shape, device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;
        map.insert(name.to_string(), tensor);
    }
    Ok(map)
}

/// Converts a safetensors dtype to a candle dtype.
fn safetensors_dtype_to_candle(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    }
}
