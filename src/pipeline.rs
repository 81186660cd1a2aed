//! End-to-end prediction for one audio file.
//!
//! file → waveform → segments → spectrograms → features → batched
//! inference → averaged probabilities → label. Every intermediate value is
//! owned by the call; only the classifier is shared.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::analysis::{
    FeaturePreprocessor, MelConfig, PredictionAggregator, PredictionResult, PreprocessedFeature,
    SpectrogramExtractor,
};
use crate::audio::{load_waveform, Waveform, Windower};
use crate::config::{MAX_BATCH, OVERLAP_MS, SAMPLE_RATE, WINDOW_MS};
use crate::error::PipelineError;
use crate::inference::{Classifier, ProbabilityVector};

/// Immutable preprocessing + inference chain shared across requests
pub struct PredictionPipeline {
    sample_rate: u32,
    windower: Windower,
    extractor: SpectrogramExtractor,
    preprocessor: FeaturePreprocessor,
    aggregator: PredictionAggregator,
    classifier: Arc<dyn Classifier>,
    max_batch: usize,
}

impl PredictionPipeline {
    /// Build the pipeline with the fixed model parameters
    pub fn new(classifier: Arc<dyn Classifier>) -> Result<Self, PipelineError> {
        Ok(Self {
            sample_rate: SAMPLE_RATE,
            windower: Windower::new(SAMPLE_RATE, WINDOW_MS, OVERLAP_MS)?,
            extractor: SpectrogramExtractor::new(MelConfig::default()),
            preprocessor: FeaturePreprocessor::default(),
            aggregator: PredictionAggregator::default(),
            classifier,
            max_batch: MAX_BATCH,
        })
    }

    /// Override the largest batch handed to the classifier (minimum 1)
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    pub fn windower(&self) -> &Windower {
        &self.windower
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    /// Decode `path` and classify it
    pub fn predict_file<P: AsRef<Path>>(&self, path: P) -> Result<PredictionResult, PipelineError> {
        let started = Instant::now();
        let waveform = load_waveform(path.as_ref(), self.sample_rate, true)?;
        let result = self.predict_waveform(&waveform)?;

        info!(
            path = %path.as_ref().display(),
            duration_ms = waveform.duration_ms() as u64,
            segments = result.segments,
            prediction = %result.label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "prediction complete"
        );
        Ok(result)
    }

    /// Classify an already decoded waveform at the pipeline's sample rate
    pub fn predict_waveform(&self, waveform: &Waveform) -> Result<PredictionResult, PipelineError> {
        if waveform.sample_rate != self.sample_rate {
            return Err(PipelineError::InvalidInput {
                reason: format!(
                    "waveform is {} Hz, pipeline expects {} Hz",
                    waveform.sample_rate, self.sample_rate
                ),
            });
        }

        let features = self.features(waveform)?;
        let probabilities = self.classify(&features)?;
        self.aggregator.aggregate(&probabilities)
    }

    /// Segment a waveform and turn every segment into a model input
    pub fn features(&self, waveform: &Waveform) -> Result<Vec<PreprocessedFeature>, PipelineError> {
        let segments = self.windower.split(waveform)?;
        debug!(
            segments = segments.len(),
            padded = segments.iter().filter(|s| s.is_padded()).count(),
            "waveform split"
        );

        segments
            .iter()
            .map(|segment| {
                let spectrogram = self.extractor.extract(&segment.samples)?;
                self.preprocessor.process(&spectrogram)
            })
            .collect()
    }

    /// Run the classifier in batches of at most `max_batch`, preserving order
    pub fn classify(
        &self,
        features: &[PreprocessedFeature],
    ) -> Result<Vec<ProbabilityVector>, PipelineError> {
        if features.is_empty() {
            return Err(PipelineError::no_segments());
        }

        let expected = self.classifier.num_classes();
        let mut probabilities = Vec::with_capacity(features.len());

        for batch in features.chunks(self.max_batch) {
            let predictions = self.classifier.predict(batch)?;
            if predictions.len() != batch.len() {
                return Err(PipelineError::Inference {
                    reason: format!(
                        "classifier returned {} predictions for {} inputs",
                        predictions.len(),
                        batch.len()
                    ),
                });
            }
            if let Some(bad) = predictions.iter().find(|p| p.len() != expected) {
                return Err(PipelineError::Inference {
                    reason: format!(
                        "classifier returned {} probabilities, expected {}",
                        bad.len(),
                        expected
                    ),
                });
            }
            probabilities.extend(predictions);
        }

        Ok(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NUM_CLASSES;
    use ndarray::Array3;
    use std::sync::Mutex;

    /// Scores each feature by its mean value and records batch sizes.
    struct RecordingClassifier {
        batches: Mutex<Vec<usize>>,
    }

    impl RecordingClassifier {
        fn new() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
            }
        }
    }

    impl Classifier for RecordingClassifier {
        fn predict(
            &self,
            batch: &[PreprocessedFeature],
        ) -> Result<Vec<ProbabilityVector>, PipelineError> {
            self.batches.lock().unwrap().push(batch.len());
            Ok(batch
                .iter()
                .map(|feature| {
                    let marker = feature.mean().unwrap_or(0.0);
                    vec![marker, 0.0, 0.0, 1.0 - marker]
                })
                .collect())
        }

        fn num_classes(&self) -> usize {
            NUM_CLASSES
        }
    }

    struct ShortClassifier;

    impl Classifier for ShortClassifier {
        fn predict(
            &self,
            batch: &[PreprocessedFeature],
        ) -> Result<Vec<ProbabilityVector>, PipelineError> {
            Ok(vec![vec![1.0, 0.0, 0.0, 0.0]; batch.len().saturating_sub(1)])
        }

        fn num_classes(&self) -> usize {
            NUM_CLASSES
        }
    }

    fn tone(seconds: f32) -> Waveform {
        let len = (seconds * SAMPLE_RATE as f32) as usize;
        Waveform::new(
            (0..len)
                .map(|i| (2.0 * std::f32::consts::PI * 3_000.0 * i as f32 / SAMPLE_RATE as f32).sin())
                .collect(),
            SAMPLE_RATE,
        )
    }

    #[test]
    fn test_batches_are_chunked_in_order() {
        let classifier = Arc::new(RecordingClassifier::new());
        let pipeline = PredictionPipeline::new(classifier.clone()).unwrap();

        let features: Vec<PreprocessedFeature> = (0..70)
            .map(|i| Array3::from_elem((64, 108, 1), i as f32 / 70.0))
            .collect();
        let probabilities = pipeline.classify(&features).unwrap();

        assert_eq!(*classifier.batches.lock().unwrap(), vec![32, 32, 6]);
        assert_eq!(probabilities.len(), 70);
        assert!((probabilities[69][0] - 69.0 / 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_features_shape_for_short_clip() {
        let pipeline = PredictionPipeline::new(Arc::new(RecordingClassifier::new())).unwrap();
        let features = pipeline.features(&tone(1.0)).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].dim(), (64, 108, 1));
    }

    #[test]
    fn test_predict_waveform_end_to_end() {
        let pipeline = PredictionPipeline::new(Arc::new(RecordingClassifier::new())).unwrap();
        let result = pipeline.predict_waveform(&tone(12.0)).unwrap();
        // 12 s: full windows at 0, 2.5 and 5 s plus a padded tail at 7.5 s
        assert_eq!(result.segments, 4);
        assert_eq!(result.probabilities.len(), NUM_CLASSES);
        let total: f32 = result.probabilities.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_wrong_sample_rate_rejected() {
        let pipeline = PredictionPipeline::new(Arc::new(RecordingClassifier::new())).unwrap();
        let waveform = Waveform::new(vec![0.0; 1_000], 44_100);
        assert!(matches!(
            pipeline.predict_waveform(&waveform),
            Err(PipelineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_empty_waveform_reports_no_segments() {
        let pipeline = PredictionPipeline::new(Arc::new(RecordingClassifier::new())).unwrap();
        let err = pipeline
            .predict_waveform(&Waveform::new(Vec::new(), SAMPLE_RATE))
            .unwrap_err();
        assert_eq!(err, PipelineError::no_segments());
    }

    #[test]
    fn test_short_classifier_output_is_an_error() {
        let pipeline = PredictionPipeline::new(Arc::new(ShortClassifier)).unwrap();
        assert!(matches!(
            pipeline.predict_waveform(&tone(6.0)),
            Err(PipelineError::Inference { .. })
        ));
    }
}
