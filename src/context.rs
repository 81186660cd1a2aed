// AppContext: Dependency Injection Container
// Holds the process-scoped state handed to every request handler

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::ServiceConfig;
use crate::inference::Classifier;
use crate::pipeline::PredictionPipeline;

/// AppContext: explicitly constructed handle shared by all requests
///
/// Built once in `main` after the model loads, then cloned into the
/// router as state. Everything inside is immutable, so clones are cheap
/// `Arc` bumps and no locking happens here.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<ServiceConfig>,
    pipeline: Arc<PredictionPipeline>,
    started_at: Instant,
}

impl AppContext {
    /// Create the context and make sure the upload directory exists
    ///
    /// # Arguments
    /// * `config` - Deployment configuration
    /// * `classifier` - Loaded model; becomes read-only from here on
    pub fn new(config: ServiceConfig, classifier: Arc<dyn Classifier>) -> Result<Self> {
        fs::create_dir_all(&config.upload_dir).with_context(|| {
            format!(
                "creating upload directory {}",
                config.upload_dir.display()
            )
        })?;

        let pipeline = PredictionPipeline::new(classifier).context("building pipeline")?;
        info!(
            upload_dir = %config.upload_dir.display(),
            classifier = %pipeline.classifier().describe(),
            "application context ready"
        );

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            started_at: Instant::now(),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn pipeline(&self) -> Arc<PredictionPipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PreprocessedFeature;
    use crate::error::PipelineError;
    use crate::inference::ProbabilityVector;

    struct NullClassifier;

    impl Classifier for NullClassifier {
        fn predict(
            &self,
            batch: &[PreprocessedFeature],
        ) -> Result<Vec<ProbabilityVector>, PipelineError> {
            Ok(vec![vec![0.25; 4]; batch.len()])
        }

        fn num_classes(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_context_creates_upload_dir() {
        let root = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            upload_dir: root.path().join("nested").join("uploads"),
            ..ServiceConfig::default()
        };

        let context = AppContext::new(config, Arc::new(NullClassifier)).unwrap();
        assert!(context.config().upload_dir.is_dir());
    }

    #[test]
    fn test_context_clones_share_pipeline() {
        let root = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            upload_dir: root.path().to_path_buf(),
            ..ServiceConfig::default()
        };

        let context = AppContext::new(config, Arc::new(NullClassifier)).unwrap();
        let clone = context.clone();
        assert!(Arc::ptr_eq(&context.pipeline(), &clone.pipeline()));
    }
}
