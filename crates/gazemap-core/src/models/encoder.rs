//! Convolutional image encoder shared by both model variants.

use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};

/// Channel count at the encoder bottleneck.
pub const BOTTLENECK_CHANNELS: usize = 128;

/// Spatial edge length at the encoder bottleneck (224 / 2^4).
pub const BOTTLENECK_SIZE: usize = 14;

/// Per-block (in, out) channel counts. Each block halves the spatial size.
const BLOCKS: [(usize, usize); 4] = [(3, 32), (32, 64), (64, 128), (128, BOTTLENECK_CHANNELS)];

/// VGG-flavored encoder: stacked 3×3 conv + ReLU + 2×2 max-pool blocks,
/// mapping a `(B, 3, 224, 224)` image to a `(B, 128, 14, 14)` bottleneck.
pub struct ConvEncoder {
    blocks: Vec<Conv2d>,
}

impl ConvEncoder {
    /// Builds the encoder under the given variable scope.
    ///
    /// # Errors
    ///
    /// Returns an error if a convolution cannot be created.
    pub fn new(vb: &VarBuilder) -> Result<Self> {
        let mut blocks = Vec::with_capacity(BLOCKS.len());
        for (i, (in_c, out_c)) in BLOCKS.iter().enumerate() {
            let conv = conv2d(
                *in_c,
                *out_c,
                3,
                Conv2dConfig {
                    padding: 1,
                    ..Conv2dConfig::default()
                },
                vb.pp(format!("block{i}")),
            )?;
            blocks.push(conv);
        }
        Ok(Self { blocks })
    }
}

impl Module for ConvEncoder {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mut h = x.clone();
        for conv in &self.blocks {
            h = conv.forward(&h)?.relu()?.max_pool2d(2)?;
        }
        Ok(h)
    }
}
