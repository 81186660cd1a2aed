// Windower - split a waveform into overlapping fixed-length segments
//
// Segments start at 0, step, 2*step, ... while a full window fits. If
// samples remain past the end of the last full window, one more segment
// is emitted at the next step offset and zero-padded to full length. Every
// segment therefore has the same length, and any non-empty waveform
// (including one shorter than a window) yields at least one segment.

use super::loader::Waveform;
use crate::error::PipelineError;

/// A fixed-length slice of a waveform
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Offset of the first sample within the source waveform
    pub start: usize,
    /// Exactly `Windower::window_len()` samples
    pub samples: Vec<f32>,
    /// How many trailing samples are zero padding
    pub padding: usize,
}

impl Segment {
    pub fn is_padded(&self) -> bool {
        self.padding > 0
    }
}

/// Overlapping window splitter with zero-padded tail
#[derive(Debug, Clone, Copy)]
pub struct Windower {
    window_len: usize,
    step: usize,
}

impl Windower {
    /// Create a windower for the given sample rate
    ///
    /// # Arguments
    /// * `sample_rate` - Samples per second of the waveforms to split
    /// * `window_ms` - Segment duration in milliseconds
    /// * `overlap_ms` - Shared duration between neighbours (must be < `window_ms`)
    pub fn new(sample_rate: u32, window_ms: u32, overlap_ms: u32) -> Result<Self, PipelineError> {
        if window_ms == 0 || overlap_ms >= window_ms {
            return Err(PipelineError::InvalidInput {
                reason: format!(
                    "overlap ({} ms) must be shorter than a non-empty window ({} ms)",
                    overlap_ms, window_ms
                ),
            });
        }

        let window_len = ms_to_samples(window_ms, sample_rate);
        let step = ms_to_samples(window_ms - overlap_ms, sample_rate);
        if window_len == 0 || step == 0 {
            return Err(PipelineError::InvalidInput {
                reason: format!(
                    "window of {} ms at {} Hz is shorter than one sample",
                    window_ms, sample_rate
                ),
            });
        }

        Ok(Self { window_len, step })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Segment start offsets and padding for a signal of `len` samples.
    pub fn plan(&self, len: usize) -> Vec<(usize, usize)> {
        if len == 0 {
            return Vec::new();
        }

        let mut plan = Vec::new();
        let mut start = 0;
        while start + self.window_len <= len {
            plan.push((start, 0));
            start += self.step;
        }

        let covered = plan
            .last()
            .map(|&(last, _)| last + self.window_len)
            .unwrap_or(0);
        if covered < len {
            // `start` already points at the next step offset (or 0)
            plan.push((start, start + self.window_len - len));
        }

        plan
    }

    /// Split a waveform into segments
    ///
    /// # Errors
    /// * `PipelineError::EmptyResult` - the waveform has no samples
    pub fn split(&self, waveform: &Waveform) -> Result<Vec<Segment>, PipelineError> {
        let plan = self.plan(waveform.len());
        if plan.is_empty() {
            return Err(PipelineError::no_segments());
        }

        Ok(plan
            .into_iter()
            .map(|(start, padding)| {
                let end = start + self.window_len - padding;
                let mut samples = Vec::with_capacity(self.window_len);
                samples.extend_from_slice(&waveform.samples[start..end]);
                samples.resize(self.window_len, 0.0);
                Segment {
                    start,
                    samples,
                    padding,
                }
            })
            .collect())
    }
}

fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OVERLAP_MS, SAMPLE_RATE, WINDOW_MS};

    fn windower() -> Windower {
        Windower::new(SAMPLE_RATE, WINDOW_MS, OVERLAP_MS).unwrap()
    }

    fn ramp(len: usize) -> Waveform {
        Waveform::new((0..len).map(|i| i as f32 + 1.0).collect(), SAMPLE_RATE)
    }

    #[test]
    fn test_default_lengths() {
        let w = windower();
        assert_eq!(w.window_len(), 110_250);
        assert_eq!(w.step(), 55_125);
    }

    #[test]
    fn test_exactly_one_window() {
        let w = windower();
        let segments = w.split(&ramp(w.window_len())).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0);
        assert!(!segments[0].is_padded());
    }

    #[test]
    fn test_shorter_than_window_is_padded() {
        let w = windower();
        let segments = w.split(&ramp(1_000)).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].samples.len(), w.window_len());
        assert_eq!(segments[0].padding, w.window_len() - 1_000);
        assert_eq!(segments[0].samples[999], 1_000.0);
        assert_eq!(segments[0].samples[1_000], 0.0);
    }

    #[test]
    fn test_empty_waveform_fails() {
        let err = windower().split(&ramp(0)).unwrap_err();
        assert_eq!(err, PipelineError::no_segments());
    }

    #[test]
    fn test_overlapping_starts() {
        let w = Windower::new(1_000, 100, 50).unwrap();
        // 250 samples: full windows at 0, 50, 100, 150 cover everything
        let segments = w.split(&ramp(250)).unwrap();
        let starts: Vec<usize> = segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 50, 100, 150]);
        assert!(segments.iter().all(|s| !s.is_padded()));
        assert_eq!(segments[1].samples[0], 51.0);
    }

    #[test]
    fn test_tail_is_padded_at_next_step() {
        let w = Windower::new(1_000, 100, 50).unwrap();
        let segments = w.split(&ramp(230)).unwrap();
        let plan: Vec<(usize, usize)> = segments.iter().map(|s| (s.start, s.padding)).collect();
        assert_eq!(plan, vec![(0, 0), (50, 0), (100, 0), (150, 20)]);
        assert!(segments.iter().all(|s| s.samples.len() == 100));
    }

    #[test]
    fn test_all_segments_same_length() {
        let w = windower();
        let segments = w.split(&ramp(w.window_len() * 3 + 17)).unwrap();
        assert!(segments.iter().all(|s| s.samples.len() == w.window_len()));
        assert_eq!(segments.iter().filter(|s| s.is_padded()).count(), 1);
    }

    #[test]
    fn test_invalid_overlap() {
        assert!(Windower::new(SAMPLE_RATE, 1_000, 1_000).is_err());
        assert!(Windower::new(SAMPLE_RATE, 0, 0).is_err());
    }
}
