//! Saliency model variants built on Candle.
//!
//! The architectures are deliberately small: the pipeline, not the network,
//! is the subject. Both variants share the convolutional encoder; the
//! multimodal variant additionally conditions on a caption embedding.

mod baseline;
mod decoder;
mod device;
mod encoder;
mod loss;
mod multimodal;

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use candle_core::{Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use tracing::{debug, info};

pub use baseline::BaselineModel;
pub use decoder::ConvDecoder;
pub use device::get_device;
pub use encoder::{ConvEncoder, BOTTLENECK_CHANNELS, BOTTLENECK_SIZE};
pub use loss::KlDivergence;
pub use multimodal::MultimodalModel;

/// Variable-name prefix for the shared encoder.
pub const ENCODER_SCOPE: &str = "encoder.";

/// Trait implemented by both saliency model variants.
pub trait SaliencyModel: Send {
    /// Variant name, used in logs and artifact file names.
    fn name(&self) -> &'static str;

    /// Whether [`predict`](Self::predict) requires caption embeddings.
    fn uses_captions(&self) -> bool;

    /// Predicts unnormalized saliency logits.
    ///
    /// `images` is `(B, 3, 224, 224)`; `captions`, when required, is
    /// `(B, 768)`. The output is `(B, 224, 224)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor op fails or captions are missing for a
    /// caption-conditioned model.
    fn predict(&self, images: &Tensor, captions: Option<&Tensor>) -> candle_core::Result<Tensor>;
}

/// Which model variant to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Image-only model.
    Baseline,
    /// Image + caption model.
    Multimodal,
}

impl ModelKind {
    /// Builds the selected variant with variables registered in `vb`.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be created.
    pub fn build(self, vb: &VarBuilder) -> Result<Box<dyn SaliencyModel>> {
        Ok(match self {
            Self::Baseline => Box::new(BaselineModel::new(vb)?),
            Self::Multimodal => Box::new(MultimodalModel::new(vb)?),
        })
    }
}

/// Returns the variables the optimizer should update.
///
/// With `fine_tune` disabled, encoder variables are excluded so pretrained
/// features stay frozen.
///
/// # Errors
///
/// Returns an error if the variable map lock is poisoned.
pub fn trainable_vars(varmap: &VarMap, fine_tune: bool) -> Result<Vec<Var>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|e| anyhow!("Lock poisoned: {e}"))?;
    let vars = data
        .iter()
        .filter(|(name, _)| fine_tune || !name.starts_with(ENCODER_SCOPE))
        .map(|(_, var)| var.clone())
        .collect();
    Ok(vars)
}

/// Overwrites matching variables with pretrained tensors.
///
/// Only names present in both the variable map and `weights` are applied;
/// the count of applied tensors is returned. Shape mismatches are errors.
///
/// # Errors
///
/// Returns an error if a tensor cannot be applied or the lock is poisoned.
pub fn apply_pretrained(varmap: &VarMap, weights: &HashMap<String, Tensor>) -> Result<usize> {
    let data = varmap
        .data()
        .lock()
        .map_err(|e| anyhow!("Lock poisoned: {e}"))?;
    let mut applied = 0usize;
    for (name, var) in data.iter() {
        if let Some(tensor) = weights.get(name) {
            var.set(tensor)
                .map_err(|e| anyhow!("Failed to apply pretrained tensor '{name}': {e}"))?;
            applied += 1;
        } else {
            debug!("No pretrained tensor for '{name}'");
        }
    }
    info!("Applied {applied} pretrained tensors");
    Ok(applied)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn build_baseline(varmap: &VarMap) -> Box<dyn SaliencyModel> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        ModelKind::Baseline.build(&vb).unwrap()
    }

    #[test]
    fn test_trainable_vars_frozen_encoder() {
        let varmap = VarMap::new();
        let _model = build_baseline(&varmap);

        let all = trainable_vars(&varmap, true).unwrap();
        let frozen = trainable_vars(&varmap, false).unwrap();
        assert!(frozen.len() < all.len());
        assert!(!frozen.is_empty());
    }

    #[test]
    fn test_apply_pretrained_counts_matches() {
        let varmap = VarMap::new();
        let _model = build_baseline(&varmap);

        // Clone one real var into a weights map and apply it back.
        let (name, tensor) = {
            let data = varmap.data().lock().unwrap();
            let (name, var) = data
                .iter()
                .find(|(n, _)| n.starts_with(ENCODER_SCOPE))
                .unwrap();
            (name.clone(), var.as_tensor().clone())
        };
        let weights = HashMap::from([(name, tensor)]);

        let applied = apply_pretrained(&varmap, &weights).unwrap();
        assert_eq!(applied, 1);
    }
}
