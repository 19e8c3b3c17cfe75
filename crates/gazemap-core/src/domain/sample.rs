//! Dataset sample types with fixed tensor shapes.

use crate::error::{CoreError, CoreResult};

/// Model-facing edge length: images and saliency maps are resized to
/// `INPUT_SIZE` × `INPUT_SIZE`.
pub const INPUT_SIZE: usize = 224;

/// Dimensionality of caption embeddings.
pub const EMBED_DIM: usize = 768;

/// Number of image channels.
pub const CHANNELS: usize = 3;

/// Element count of a preprocessed image tensor (CHW layout).
pub const IMAGE_LEN: usize = CHANNELS * INPUT_SIZE * INPUT_SIZE;

/// Element count of a saliency map tensor.
pub const MAP_LEN: usize = INPUT_SIZE * INPUT_SIZE;

/// One (image, caption embedding, saliency map) triple.
///
/// All tensors are flat `f32` buffers with fixed shapes: the image is
/// `3×224×224` (CHW, VGG-preprocessed), the caption embedding is `768`, the
/// saliency map is `224×224` with values in `[0, 1]`. Immutable once built.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Preprocessed image pixels, CHW.
    pub image: Vec<f32>,
    /// Caption embedding.
    pub caption: Vec<f32>,
    /// Ground-truth saliency map, row-major.
    pub saliency: Vec<f32>,
}

impl Sample {
    /// Builds a sample, validating tensor shapes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Shape`] if any buffer has the wrong length.
    pub fn new(image: Vec<f32>, caption: Vec<f32>, saliency: Vec<f32>) -> CoreResult<Self> {
        if image.len() != IMAGE_LEN {
            return Err(CoreError::Shape {
                field: "image",
                expected: IMAGE_LEN,
                actual: image.len(),
            });
        }
        if caption.len() != EMBED_DIM {
            return Err(CoreError::Shape {
                field: "caption",
                expected: EMBED_DIM,
                actual: caption.len(),
            });
        }
        if saliency.len() != MAP_LEN {
            return Err(CoreError::Shape {
                field: "saliency",
                expected: MAP_LEN,
                actual: saliency.len(),
            });
        }
        Ok(Self {
            image,
            caption,
            saliency,
        })
    }
}

/// A decoded, preprocessed image together with its original dimensions.
///
/// The original dimensions drive saliency-map rasterization; the pixels are
/// already resized and VGG-preprocessed for the model.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Preprocessed pixels, CHW, `3×224×224`.
    pub pixels: Vec<f32>,
    /// Height of the source image in pixels.
    pub orig_height: usize,
    /// Width of the source image in pixels.
    pub orig_width: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_shape_validation() {
        let ok = Sample::new(
            vec![0.0; IMAGE_LEN],
            vec![0.0; EMBED_DIM],
            vec![0.0; MAP_LEN],
        );
        assert!(ok.is_ok());

        let bad = Sample::new(vec![0.0; 10], vec![0.0; EMBED_DIM], vec![0.0; MAP_LEN]);
        assert!(matches!(
            bad,
            Err(CoreError::Shape {
                field: "image",
                ..
            })
        ));
    }
}
