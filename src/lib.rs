// Bird Call Classifier - Rust inference service
// Audio upload -> mel spectrogram segments -> pretrained model -> species label

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod inference;
pub mod pipeline;

// Re-exports for convenience
pub use analysis::PredictionResult;
pub use context::AppContext;
pub use pipeline::PredictionPipeline;

use tracing::Level;

/// Install the global tracing subscriber for binaries
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
