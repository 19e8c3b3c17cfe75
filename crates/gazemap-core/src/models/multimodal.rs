//! Image + caption saliency model.

use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};

use super::decoder::ConvDecoder;
use super::encoder::{ConvEncoder, BOTTLENECK_CHANNELS, BOTTLENECK_SIZE};
use super::SaliencyModel;
use crate::domain::EMBED_DIM;

/// Multimodal model: the caption embedding is projected, broadcast over the
/// encoder bottleneck, concatenated on the channel axis, and fused back to
/// the decoder's input width.
pub struct MultimodalModel {
    encoder: ConvEncoder,
    caption_proj: Linear,
    fuse: Conv2d,
    decoder: ConvDecoder,
}

impl MultimodalModel {
    /// Builds the model. Encoder variables live under the `encoder.` scope
    /// so pretrained weights can be loaded and frozen selectively.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be created.
    pub fn new(vb: &VarBuilder) -> Result<Self> {
        let encoder = ConvEncoder::new(&vb.pp("encoder"))?;
        let caption_proj = linear(EMBED_DIM, BOTTLENECK_CHANNELS, vb.pp("caption_proj"))?;
        let fuse = conv2d(
            2 * BOTTLENECK_CHANNELS,
            BOTTLENECK_CHANNELS,
            1,
            Conv2dConfig::default(),
            vb.pp("fuse"),
        )?;
        let decoder = ConvDecoder::new(&vb.pp("decoder"))?;
        Ok(Self {
            encoder,
            caption_proj,
            fuse,
            decoder,
        })
    }
}

impl SaliencyModel for MultimodalModel {
    fn name(&self) -> &'static str {
        "multimodal"
    }

    fn uses_captions(&self) -> bool {
        true
    }

    fn predict(
        &self,
        images: &Tensor,
        captions: Option<&Tensor>,
    ) -> candle_core::Result<Tensor> {
        let Some(captions) = captions else {
            candle_core::bail!("multimodal model requires caption embeddings")
        };

        let bottleneck = self.encoder.forward(images)?;
        let batch = bottleneck.dim(0)?;

        // (B, 768) -> (B, 128, 14, 14), broadcast over the spatial grid.
        let cap = self.caption_proj.forward(captions)?.relu()?;
        let cap = cap
            .unsqueeze(2)?
            .unsqueeze(3)?
            .broadcast_as((batch, BOTTLENECK_CHANNELS, BOTTLENECK_SIZE, BOTTLENECK_SIZE))?;

        let fused = Tensor::cat(&[&bottleneck, &cap], 1)?;
        let fused = self.fuse.forward(&fused)?.relu()?;
        self.decoder.forward(&fused)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::INPUT_SIZE;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_multimodal_predict_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = MultimodalModel::new(&vb).unwrap();

        let images = Tensor::zeros((2, 3, 224, 224), DType::F32, &device).unwrap();
        let captions = Tensor::zeros((2, EMBED_DIM), DType::F32, &device).unwrap();
        let out = model.predict(&images, Some(&captions)).unwrap();
        assert_eq!(out.dims(), &[2, INPUT_SIZE, INPUT_SIZE]);
    }

    #[test]
    fn test_multimodal_requires_captions() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = MultimodalModel::new(&vb).unwrap();

        let images = Tensor::zeros((1, 3, 224, 224), DType::F32, &device).unwrap();
        assert!(model.predict(&images, None).is_err());
    }
}
