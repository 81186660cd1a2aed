// Error types for the birdcall classifier
//
// This module defines the error types raised by the preprocessing/inference
// pipeline and by model loading, each carrying a stable numeric code.

mod model;
mod pipeline;

pub use model::{log_model_error, ModelError, ModelErrorCodes};
pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so the HTTP layer and the CLI can report
/// failures consistently.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
