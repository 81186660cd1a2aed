// Pipeline error types and constants

use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Pipeline error code constants
///
/// Error code range: 3001-3006
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// Uploaded file could not be read from disk
    pub const IO: i32 = 3001;

    /// File is not a decodable audio container
    pub const AUDIO_DECODE: i32 = 3002;

    /// Windowing or aggregation had nothing to work with
    pub const EMPTY_RESULT: i32 = 3003;

    /// Malformed input to a pipeline stage (shape, length, parameters)
    pub const INVALID_INPUT: i32 = 3004;

    /// Classifier forward pass failed or returned an unexpected shape
    pub const INFERENCE: i32 = 3005;

    /// Mutex guarding the classifier session was poisoned
    pub const LOCK_POISONED: i32 = 3006;
}

/// Log a pipeline error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        code = err.code(),
        component = "PredictionPipeline",
        "Pipeline error in {}: {}",
        context,
        err.message()
    );
}

/// Errors raised while turning an audio file into a prediction
///
/// Every variant is request-scoped: the HTTP layer reports it as a 500
/// and the process keeps serving.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// File could not be opened or read
    Io { details: String },

    /// Container/codec could not be decoded
    AudioDecode { reason: String },

    /// No segments or no probability vectors to work with
    EmptyResult { reason: String },

    /// Input had the wrong shape, length, or parameters
    InvalidInput { reason: String },

    /// Model forward pass failed
    Inference { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl PipelineError {
    /// Error used when windowing yields nothing to classify.
    pub fn no_segments() -> Self {
        PipelineError::EmptyResult {
            reason: "No valid audio segments found.".to_string(),
        }
    }
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::Io { .. } => PipelineErrorCodes::IO,
            PipelineError::AudioDecode { .. } => PipelineErrorCodes::AUDIO_DECODE,
            PipelineError::EmptyResult { .. } => PipelineErrorCodes::EMPTY_RESULT,
            PipelineError::InvalidInput { .. } => PipelineErrorCodes::INVALID_INPUT,
            PipelineError::Inference { .. } => PipelineErrorCodes::INFERENCE,
            PipelineError::LockPoisoned { .. } => PipelineErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::Io { details } => format!("I/O error: {}", details),
            PipelineError::AudioDecode { reason } => {
                format!("Could not decode audio: {}", reason)
            }
            PipelineError::EmptyResult { reason } => reason.clone(),
            PipelineError::InvalidInput { reason } => format!("Invalid input: {}", reason),
            PipelineError::Inference { reason } => format!("Model inference error: {}", reason),
            PipelineError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_codes() {
        assert_eq!(
            PipelineError::Io {
                details: "x".to_string()
            }
            .code(),
            PipelineErrorCodes::IO
        );
        assert_eq!(
            PipelineError::AudioDecode {
                reason: "x".to_string()
            }
            .code(),
            PipelineErrorCodes::AUDIO_DECODE
        );
        assert_eq!(
            PipelineError::no_segments().code(),
            PipelineErrorCodes::EMPTY_RESULT
        );
        assert_eq!(
            PipelineError::InvalidInput {
                reason: "x".to_string()
            }
            .code(),
            PipelineErrorCodes::INVALID_INPUT
        );
        assert_eq!(
            PipelineError::Inference {
                reason: "x".to_string()
            }
            .code(),
            PipelineErrorCodes::INFERENCE
        );
        assert_eq!(
            PipelineError::LockPoisoned {
                component: "x".to_string()
            }
            .code(),
            PipelineErrorCodes::LOCK_POISONED
        );
    }

    #[test]
    fn test_empty_result_message_is_verbatim() {
        assert_eq!(
            PipelineError::no_segments().message(),
            "No valid audio segments found."
        );
    }

    #[test]
    fn test_display_includes_code() {
        let err = PipelineError::AudioDecode {
            reason: "bad header".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("3002"));
        assert!(display.contains("bad header"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing clip");
        match PipelineError::from(io_err) {
            PipelineError::Io { details } => assert!(details.contains("missing clip")),
            other => panic!("Expected Io, got {:?}", other),
        }
    }
}
