// SpectrogramExtractor - log-power mel spectrogram of one segment
//
// Mirrors librosa's defaults (slaney mel scale and area normalization,
// centered frames, power 2.0) followed by a decibel conversion relative
// to the loudest bin with an 80 dB floor.

use ndarray::Array2;
use tracing::trace;

use super::fft::FftProcessor;
use crate::config::SAMPLE_RATE;
use crate::error::PipelineError;

/// Mel spectrogram laid out as (mel bands, frames)
pub type Spectrogram = Array2<f32>;

const AMIN: f32 = 1e-10;

/// Fixed transform parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub f_min: f32,
    /// Upper band edge; Nyquist when `None`
    pub f_max: Option<f32>,
    /// Dynamic range kept below the peak; unbounded when `None`
    pub top_db: Option<f32>,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            f_min: 0.0,
            f_max: None,
            top_db: Some(80.0),
        }
    }
}

/// Converts waveform segments into log-mel spectrograms
pub struct SpectrogramExtractor {
    config: MelConfig,
    fft: FftProcessor,
    /// (n_mels, n_freqs) triangular filters
    filterbank: Array2<f32>,
}

impl SpectrogramExtractor {
    pub fn new(config: MelConfig) -> Self {
        let f_max = config.f_max.unwrap_or(config.sample_rate as f32 / 2.0);
        let filterbank = mel_filterbank(
            config.sample_rate,
            config.n_fft,
            config.n_mels,
            config.f_min,
            f_max,
        );

        Self {
            config,
            fft: FftProcessor::new(config.n_fft),
            filterbank,
        }
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Output shape (mel bands, frames) for a segment of `len` samples
    pub fn output_shape(&self, len: usize) -> (usize, usize) {
        (
            self.config.n_mels,
            FftProcessor::frame_count(len, self.config.hop_length),
        )
    }

    /// Extract a decibel-scaled mel spectrogram
    ///
    /// # Errors
    /// * `PipelineError::InvalidInput` - empty or non-finite segment
    pub fn extract(&self, samples: &[f32]) -> Result<Spectrogram, PipelineError> {
        if samples.is_empty() {
            return Err(PipelineError::InvalidInput {
                reason: "cannot build a spectrogram from an empty segment".to_string(),
            });
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(PipelineError::InvalidInput {
                reason: "segment contains non-finite samples".to_string(),
            });
        }

        let power = self
            .fft
            .power_spectrogram(samples, self.config.hop_length);
        let mel = self.filterbank.dot(&power);
        let db = power_to_db(mel, self.config.top_db);

        trace!(shape = ?db.dim(), "extracted mel spectrogram");
        Ok(db)
    }
}

/// Convert power to decibels relative to the maximum value
///
/// `10 * log10(max(x, amin) / max(peak, amin))`, floored at `-top_db`.
pub fn power_to_db(mut power: Array2<f32>, top_db: Option<f32>) -> Array2<f32> {
    let peak = power.iter().copied().fold(0.0f32, f32::max).max(AMIN);
    let reference = 10.0 * peak.log10();

    power.mapv_inplace(|x| 10.0 * x.max(AMIN).log10() - reference);

    if let Some(top_db) = top_db {
        let max_db = power.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = max_db - top_db;
        power.mapv_inplace(|x| x.max(floor));
    }

    power
}

/// Hz -> mel on the slaney scale (linear below 1 kHz, logarithmic above)
pub fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

/// Mel -> Hz on the slaney scale
pub fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Build a slaney-normalized triangular mel filterbank
///
/// # Returns
/// Array shaped (n_mels, n_fft / 2 + 1)
pub fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    f_min: f32,
    f_max: f32,
) -> Array2<f32> {
    let n_freqs = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|i| i as f64 * nyquist / (n_freqs - 1).max(1) as f64)
        .collect();

    let mel_min = hz_to_mel(f_min as f64);
    let mel_max = hz_to_mel(f_max as f64);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::<f32>::zeros((n_mels, n_freqs));
    for m in 0..n_mels {
        let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        // Area normalization: each filter integrates to roughly the same energy
        let enorm = 2.0 / (right - left);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);
            let w = lower.min(upper).max(0.0);
            weights[[m, k]] = (w * enorm) as f32;
        }
    }

    weights
}
