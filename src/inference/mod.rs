//! Classifier seam between the preprocessing pipeline and the model runtime.
//!
//! The pipeline only depends on the [`Classifier`] trait; the ONNX Runtime
//! backed implementation lives behind the `onnx` feature so the rest of the
//! crate (and its tests) builds without native libraries.

#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

use ndarray::{Array4, Axis};

use crate::analysis::PreprocessedFeature;
use crate::error::PipelineError;

/// Per-class probabilities for one segment
pub type ProbabilityVector = Vec<f32>;

/// A pretrained model mapping feature batches to class probabilities
///
/// Implementations must be safe to share across request threads; the
/// pipeline never mutates a classifier after construction.
pub trait Classifier: Send + Sync {
    /// Run a forward pass over `batch`, returning one vector per input in order
    fn predict(&self, batch: &[PreprocessedFeature]) -> Result<Vec<ProbabilityVector>, PipelineError>;

    /// Length of every returned probability vector
    fn num_classes(&self) -> usize;

    /// Short description for logs and health output
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Stack equally shaped features into an NHWC batch tensor
pub fn stack_batch(batch: &[PreprocessedFeature]) -> Result<Array4<f32>, PipelineError> {
    if batch.is_empty() {
        return Err(PipelineError::EmptyResult {
            reason: "cannot build an empty batch".to_string(),
        });
    }

    let views: Vec<_> = batch.iter().map(|feature| feature.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|err| PipelineError::InvalidInput {
        reason: format!("features differ in shape: {}", err),
    })
}

/// Split a flat row-major model output into `rows` vectors of `cols` values
pub fn split_rows(
    data: &[f32],
    rows: usize,
    cols: usize,
) -> Result<Vec<ProbabilityVector>, PipelineError> {
    if cols == 0 || data.len() != rows * cols {
        return Err(PipelineError::Inference {
            reason: format!(
                "expected {}x{} outputs, model returned {} values",
                rows,
                cols,
                data.len()
            ),
        });
    }

    Ok(data.chunks(cols).map(|row| row.to_vec()).collect())
}
