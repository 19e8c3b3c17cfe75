//! Convolutional decoder producing a full-resolution saliency map.

use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};

use crate::domain::INPUT_SIZE;

/// Per-stage (in, out) channel counts. Each stage doubles the spatial size.
const STAGES: [(usize, usize); 4] = [(128, 64), (64, 32), (32, 16), (16, 8)];

/// Decoder: alternating 3×3 conv + ReLU and nearest-neighbor upsampling
/// stages, then a 1-channel head. Maps `(B, 128, 14, 14)` to
/// `(B, 224, 224)` unnormalized saliency logits.
pub struct ConvDecoder {
    stages: Vec<Conv2d>,
    head: Conv2d,
}

impl ConvDecoder {
    /// Builds the decoder under the given variable scope.
    ///
    /// # Errors
    ///
    /// Returns an error if a convolution cannot be created.
    pub fn new(vb: &VarBuilder) -> Result<Self> {
        let mut stages = Vec::with_capacity(STAGES.len());
        for (i, (in_c, out_c)) in STAGES.iter().enumerate() {
            let conv = conv2d(
                *in_c,
                *out_c,
                3,
                Conv2dConfig {
                    padding: 1,
                    ..Conv2dConfig::default()
                },
                vb.pp(format!("stage{i}")),
            )?;
            stages.push(conv);
        }
        let head = conv2d(8, 1, 1, Conv2dConfig::default(), vb.pp("head"))?;
        Ok(Self { stages, head })
    }
}

impl Module for ConvDecoder {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mut h = x.clone();
        let mut size = x.dim(2)?;
        for conv in &self.stages {
            h = conv.forward(&h)?.relu()?;
            size *= 2;
            h = h.upsample_nearest2d(size, size)?;
        }
        debug_assert_eq!(size, INPUT_SIZE);
        self.head.forward(&h)?.squeeze(1)
    }
}
