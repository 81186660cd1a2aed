// Analysis module - segment-level feature extraction and result aggregation
//
// Module organization:
// - fft: centered short-time power spectra
// - mel: mel filterbank and dB conversion (SpectrogramExtractor)
// - preprocess: resize + min-max normalization (FeaturePreprocessor)
// - aggregate: probability averaging and label lookup (PredictionAggregator)

pub mod aggregate;
pub mod fft;
pub mod mel;
pub mod preprocess;

pub use aggregate::{PredictionAggregator, PredictionResult};
pub use mel::{MelConfig, Spectrogram, SpectrogramExtractor};
pub use preprocess::{FeaturePreprocessor, PreprocessedFeature};
