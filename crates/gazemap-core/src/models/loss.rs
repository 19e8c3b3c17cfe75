//! KL-divergence training loss.

use candle_core::{Result, Tensor, D};
use candle_nn::ops::log_softmax;

/// Guard for logarithms on the target distribution.
const EPSILON: f64 = 1e-8;

/// KL divergence between the target saliency map and the predicted one.
///
/// Predictions are unnormalized logits over pixels; the loss applies a
/// spatial log-softmax. Targets are normalized to a per-sample probability
/// distribution. The result is averaged over the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct KlDivergence;

impl KlDivergence {
    /// Computes the loss for a batch.
    ///
    /// `predicted` and `target` are both `(B, H, W)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes disagree or a tensor op fails.
    pub fn forward(&self, predicted: &Tensor, target: &Tensor) -> Result<Tensor> {
        let (batch, height, width) = predicted.dims3()?;
        let pred = predicted.reshape((batch, height * width))?;
        let tgt = target.reshape((batch, height * width))?;

        let log_p = log_softmax(&pred, D::Minus1)?;

        let mass = tgt.sum_keepdim(D::Minus1)?;
        let q = tgt.broadcast_div(&(mass + EPSILON)?)?;
        let log_q = q.clamp(EPSILON, 1.0)?.log()?;

        let per_sample = (&q * (log_q - log_p)?)?.sum(D::Minus1)?;
        per_sample.mean_all()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn map_tensor(values: &[f32], h: usize, w: usize) -> Tensor {
        Tensor::from_vec(values.to_vec(), (1, h, w), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_loss_is_finite_scalar() {
        let pred = map_tensor(&[0.5, 1.5, -0.5, 0.0], 2, 2);
        let tgt = map_tensor(&[1.0, 0.0, 0.0, 0.0], 2, 2);
        let loss = KlDivergence.forward(&pred, &tgt).unwrap();
        let value = loss.to_vec0::<f32>().unwrap();
        assert!(value.is_finite());
    }

    #[test]
    fn test_matching_prediction_scores_lower() {
        // Logits peaked where the target mass is should beat inverted ones.
        let tgt = map_tensor(&[1.0, 0.0, 0.0, 0.0], 2, 2);
        let good = map_tensor(&[4.0, 0.0, 0.0, 0.0], 2, 2);
        let bad = map_tensor(&[0.0, 4.0, 4.0, 4.0], 2, 2);

        let good_loss = KlDivergence
            .forward(&good, &tgt)
            .unwrap()
            .to_vec0::<f32>()
            .unwrap();
        let bad_loss = KlDivergence
            .forward(&bad, &tgt)
            .unwrap()
            .to_vec0::<f32>()
            .unwrap();
        assert!(good_loss < bad_loss);
    }

    #[test]
    fn test_zero_mass_target_does_not_nan() {
        let pred = map_tensor(&[0.1, 0.2, 0.3, 0.4], 2, 2);
        let tgt = map_tensor(&[0.0, 0.0, 0.0, 0.0], 2, 2);
        let loss = KlDivergence.forward(&pred, &tgt).unwrap();
        assert!(loss.to_vec0::<f32>().unwrap().is_finite());
    }
}
