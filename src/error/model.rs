// Model loading error types and constants

use crate::error::ErrorCode;
use std::fmt;
use std::path::PathBuf;
use tracing::error;

/// Model error code constants
///
/// Error code range: 4001-4002
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    /// Weights file does not exist
    pub const NOT_FOUND: i32 = 4001;

    /// Runtime rejected the weights file
    pub const LOAD_FAILED: i32 = 4002;
}

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        code = err.code(),
        component = "Classifier",
        "Model error in {}: {}",
        context,
        err.message()
    );
}

/// Startup errors for the pretrained classifier
///
/// These are fatal: the server refuses to start without a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Weights file missing
    NotFound { path: PathBuf },

    /// Weights file present but incompatible or corrupt
    Load { path: PathBuf, reason: String },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::NotFound { .. } => ModelErrorCodes::NOT_FOUND,
            ModelError::Load { .. } => ModelErrorCodes::LOAD_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::NotFound { path } => {
                format!("Model weights not found at {}", path.display())
            }
            ModelError::Load { path, reason } => {
                format!("Failed to load model {}: {}", path.display(), reason)
            }
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_codes() {
        let missing = ModelError::NotFound {
            path: PathBuf::from("model.onnx"),
        };
        assert_eq!(missing.code(), ModelErrorCodes::NOT_FOUND);
        assert!(missing.message().contains("model.onnx"));

        let bad = ModelError::Load {
            path: PathBuf::from("model.onnx"),
            reason: "protobuf parsing failed".to_string(),
        };
        assert_eq!(bad.code(), ModelErrorCodes::LOAD_FAILED);
        assert!(bad.message().contains("protobuf parsing failed"));
    }
}
