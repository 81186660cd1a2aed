// FeaturePreprocessor - fit a spectrogram to the model's input
//
// Resizing uses bilinear interpolation with half-pixel centers (the
// behaviour of TensorFlow 2's default image resize). Normalization is a
// single min-max over the whole feature.

use ndarray::{Array2, Array3, Axis};

use super::mel::Spectrogram;
use crate::config::TARGET_SHAPE;
use crate::error::PipelineError;

/// Guard against division by zero for constant spectrograms
pub const NORM_EPSILON: f32 = 1e-8;

/// Model input laid out as (height, width, channel=1), values in [0, 1]
pub type PreprocessedFeature = Array3<f32>;

/// Resizes and normalizes spectrograms to a fixed shape
#[derive(Debug, Clone, Copy)]
pub struct FeaturePreprocessor {
    height: usize,
    width: usize,
}

impl Default for FeaturePreprocessor {
    fn default() -> Self {
        Self::new(TARGET_SHAPE.0, TARGET_SHAPE.1)
    }
}

impl FeaturePreprocessor {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn target_shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Resize, add the channel axis, then min-max normalize
    ///
    /// # Errors
    /// * `PipelineError::InvalidInput` - empty spectrogram or zero target shape
    pub fn process(&self, spectrogram: &Spectrogram) -> Result<PreprocessedFeature, PipelineError> {
        if self.height == 0 || self.width == 0 {
            return Err(PipelineError::InvalidInput {
                reason: format!("target shape {}x{} is empty", self.height, self.width),
            });
        }

        let resized = resize_bilinear(spectrogram, self.height, self.width)?;
        let normalized = min_max_normalize(resized)?;
        Ok(normalized.insert_axis(Axis(2)))
    }
}

/// Bilinear resize with half-pixel centers
pub fn resize_bilinear(
    input: &Array2<f32>,
    out_height: usize,
    out_width: usize,
) -> Result<Array2<f32>, PipelineError> {
    let (in_height, in_width) = input.dim();
    if in_height == 0 || in_width == 0 {
        return Err(PipelineError::InvalidInput {
            reason: "cannot resize an empty spectrogram".to_string(),
        });
    }
    if (in_height, in_width) == (out_height, out_width) {
        return Ok(input.clone());
    }

    let rows = interpolation_weights(in_height, out_height);
    let cols = interpolation_weights(in_width, out_width);

    Ok(Array2::from_shape_fn((out_height, out_width), |(y, x)| {
        let (y0, y1, dy) = rows[y];
        let (x0, x1, dx) = cols[x];

        let top = input[[y0, x0]] + (input[[y0, x1]] - input[[y0, x0]]) * dx;
        let bottom = input[[y1, x0]] + (input[[y1, x1]] - input[[y1, x0]]) * dx;
        top + (bottom - top) * dy
    }))
}

/// (lower index, upper index, fraction) for each output coordinate.
fn interpolation_weights(in_size: usize, out_size: usize) -> Vec<(usize, usize, f32)> {
    let scale = in_size as f32 / out_size as f32;
    let last = in_size - 1;

    (0..out_size)
        .map(|i| {
            let source = (i as f32 + 0.5) * scale - 0.5;
            let floor = source.floor();
            let lower = (floor.max(0.0) as usize).min(last);
            let upper = (source.ceil().max(0.0) as usize).min(last);
            (lower, upper, source - floor)
        })
        .collect()
}

/// `(x - min) / (max - min + eps)` over every element
pub fn min_max_normalize(mut values: Array2<f32>) -> Result<Array2<f32>, PipelineError> {
    if values.is_empty() {
        return Err(PipelineError::InvalidInput {
            reason: "cannot normalize an empty spectrogram".to_string(),
        });
    }

    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min + NORM_EPSILON;

    values.mapv_inplace(|x| (x - min) / range);
    Ok(values)
}
