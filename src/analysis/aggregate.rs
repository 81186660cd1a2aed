// PredictionAggregator - combine per-segment probabilities into one answer

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::CLASS_NAMES;
use crate::error::PipelineError;
use crate::inference::ProbabilityVector;

/// Label for a class index, falling back to "Class {i}" past the table
pub fn class_label(names: &[&str], index: usize) -> String {
    match names.get(index) {
        Some(name) => (*name).to_string(),
        None => format!("Class {}", index),
    }
}

/// Element-wise mean of equally sized probability vectors
pub fn average_probabilities(vectors: &[ProbabilityVector]) -> Result<Vec<f32>, PipelineError> {
    let first = vectors.first().ok_or_else(|| PipelineError::EmptyResult {
        reason: "no predictions to aggregate".to_string(),
    })?;

    let width = first.len();
    let mut sums = vec![0.0f64; width];
    for (i, vector) in vectors.iter().enumerate() {
        if vector.len() != width {
            return Err(PipelineError::InvalidInput {
                reason: format!(
                    "prediction {} has {} classes, expected {}",
                    i,
                    vector.len(),
                    width
                ),
            });
        }
        for (sum, &p) in sums.iter_mut().zip(vector) {
            *sum += p as f64;
        }
    }

    let count = vectors.len() as f64;
    Ok(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Round to 4 decimal places for presentation
pub fn round4(value: f32) -> f64 {
    (value as f64 * 10_000.0).round() / 10_000.0
}

/// Averaged prediction for one audio file
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub class_index: usize,
    pub label: String,
    /// (label, mean probability) in class-index order
    pub probabilities: Vec<(String, f32)>,
    /// Number of segments that contributed
    pub segments: usize,
}

/// Serializes as `{"prediction": label, "probabilities": {label: p, ...}}`
/// with probabilities rounded to 4 decimals.
impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("prediction", &self.label)?;
        map.serialize_entry("probabilities", &RoundedProbabilities(&self.probabilities))?;
        map.end()
    }
}

struct RoundedProbabilities<'a>(&'a [(String, f32)]);

impl Serialize for RoundedProbabilities<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, p) in self.0 {
            map.serialize_entry(label, &round4(*p))?;
        }
        map.end()
    }
}

/// Averages segment predictions and maps the winner to a species name
#[derive(Debug, Clone, Copy)]
pub struct PredictionAggregator {
    names: &'static [&'static str],
}

impl Default for PredictionAggregator {
    fn default() -> Self {
        Self::new(&CLASS_NAMES)
    }
}

impl PredictionAggregator {
    pub fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub fn label(&self, index: usize) -> String {
        class_label(self.names, index)
    }

    /// # Errors
    /// * `PipelineError::EmptyResult` - no vectors
    /// * `PipelineError::InvalidInput` - vectors of different lengths or zero width
    pub fn aggregate(&self, vectors: &[ProbabilityVector]) -> Result<PredictionResult, PipelineError> {
        let mean = average_probabilities(vectors)?;
        let class_index = argmax(&mean).ok_or_else(|| PipelineError::InvalidInput {
            reason: "predictions have no classes".to_string(),
        })?;

        Ok(PredictionResult {
            class_index,
            label: self.label(class_index),
            probabilities: mean
                .iter()
                .enumerate()
                .map(|(i, &p)| (self.label(i), p))
                .collect(),
            segments: vectors.len(),
        })
    }
}
