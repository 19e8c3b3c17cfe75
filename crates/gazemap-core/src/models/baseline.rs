//! Image-only saliency model.

use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::VarBuilder;

use super::decoder::ConvDecoder;
use super::encoder::ConvEncoder;
use super::SaliencyModel;

/// Baseline model: convolutional encoder + decoder, no caption input.
pub struct BaselineModel {
    encoder: ConvEncoder,
    decoder: ConvDecoder,
}

impl BaselineModel {
    /// Builds the model. Encoder variables live under the `encoder.` scope
    /// so pretrained weights can be loaded and frozen selectively.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be created.
    pub fn new(vb: &VarBuilder) -> Result<Self> {
        Ok(Self {
            encoder: ConvEncoder::new(&vb.pp("encoder"))?,
            decoder: ConvDecoder::new(&vb.pp("decoder"))?,
        })
    }
}

impl SaliencyModel for BaselineModel {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn uses_captions(&self) -> bool {
        false
    }

    fn predict(
        &self,
        images: &Tensor,
        _captions: Option<&Tensor>,
    ) -> candle_core::Result<Tensor> {
        let bottleneck = self.encoder.forward(images)?;
        self.decoder.forward(&bottleneck)
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
    fn test_baseline_predict_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = BaselineModel::new(&vb).unwrap();

        let images = Tensor::zeros((1, 3, 224, 224), DType::F32, &device).unwrap();
        let out = model.predict(&images, None).unwrap();
        assert_eq!(out.dims(), &[1, INPUT_SIZE, INPUT_SIZE]);
    }

    #[test]
    fn test_encoder_vars_are_scoped() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let _model = BaselineModel::new(&vb).unwrap();

        let data = varmap.data().lock().unwrap();
        assert!(data.keys().any(|k| k.starts_with("encoder.")));
        assert!(data.keys().any(|k| k.starts_with("decoder.")));
    }
}
