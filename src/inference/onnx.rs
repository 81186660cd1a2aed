// ONNX Runtime classifier
//
// Expects an ONNX export of the Keras model: one NHWC float input
// [batch, 64, 108, 1] and a softmax output [batch, classes] first.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use super::{split_rows, stack_batch, Classifier, ProbabilityVector};
use crate::analysis::PreprocessedFeature;
use crate::error::{ModelError, PipelineError};

/// Pretrained classifier backed by an ONNX Runtime session
///
/// `Session::run` needs `&mut self`, so the session sits behind a mutex;
/// concurrent requests take turns on the forward pass only.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    num_classes: usize,
    path: PathBuf,
}

impl OnnxClassifier {
    /// Load weights from `path`
    ///
    /// # Errors
    /// * `ModelError::NotFound` - no file at `path`
    /// * `ModelError::Load` - ONNX Runtime rejected the file
    pub fn load<P: AsRef<Path>>(
        path: P,
        intra_threads: usize,
        num_classes: usize,
    ) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let load_error = |err: &dyn Display| ModelError::Load {
            path: path.to_path_buf(),
            reason: err.to_string(),
        };

        let session = Session::builder()
            .map_err(|e| load_error(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(&e))?
            .with_intra_threads(intra_threads.max(1))
            .map_err(|e| load_error(&e))?
            .commit_from_file(path)
            .map_err(|e| load_error(&e))?;

        info!(path = %path.display(), num_classes, "ONNX classifier loaded");

        Ok(Self {
            session: Mutex::new(session),
            num_classes,
            path: path.to_path_buf(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, batch: &[PreprocessedFeature]) -> Result<Vec<ProbabilityVector>, PipelineError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let input = stack_batch(batch)?;
        let tensor = Tensor::from_array(input).map_err(|e| inference_error(&e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PipelineError::LockPoisoned {
                component: "OnnxClassifier".to_string(),
            })?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| inference_error(&e))?;

        let mut output_iter = outputs.iter();
        let (_, probabilities) = output_iter.next().ok_or_else(|| PipelineError::Inference {
            reason: "model produced no output".to_string(),
        })?;

        let (_shape, data) = probabilities
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_error(&e))?;

        debug!(batch = batch.len(), values = data.len(), "forward pass complete");
        split_rows(data, batch.len(), self.num_classes)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.path.display())
    }
}

fn inference_error(err: &dyn Display) -> PipelineError {
    PipelineError::Inference {
        reason: err.to_string(),
    }
}
