// FFT module - short-time power spectra
//
// Frames are centered (zero-padded by n_fft/2 on both sides) and tapered
// with a periodic Hann window before the transform. Only the positive
// half of the spectrum is kept.

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT processor that computes power spectrogram frames
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Hann window for FFT (pre-computed)
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `fft_size` - FFT window size (2048 for the mel front end)
    pub fn new(fft_size: usize) -> Self {
        // Periodic Hann: the window repeats with period fft_size
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / fft_size as f32).cos())
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of positive-frequency bins
    pub fn n_freqs(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of centered frames for a signal of `len` samples
    pub fn frame_count(len: usize, hop: usize) -> usize {
        1 + len / hop
    }

    /// Compute the centered short-time power spectrum
    ///
    /// # Returns
    /// Array shaped (n_freqs, frames) of |X|^2 values
    pub fn power_spectrogram(&self, audio: &[f32], hop: usize) -> Array2<f32> {
        let pad = self.fft_size / 2;
        let n_frames = Self::frame_count(audio.len(), hop);
        let n_freqs = self.n_freqs();

        let mut padded = vec![0.0f32; audio.len() + 2 * pad];
        padded[pad..pad + audio.len()].copy_from_slice(audio);

        let mut power = Array2::<f32>::zeros((n_freqs, n_frames));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for frame in 0..n_frames {
            let start = frame * hop;
            let chunk = &padded[start..(start + self.fft_size).min(padded.len())];

            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = chunk.get(i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (bin, c) in buffer.iter().take(n_freqs).enumerate() {
                power[[bin, frame]] = c.norm_sqr();
            }
        }

        power
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_matches_centered_stft() {
        assert_eq!(FftProcessor::frame_count(110_250, 512), 216);
        assert_eq!(FftProcessor::frame_count(0, 512), 1);
    }

    #[test]
    fn test_window_is_periodic_hann() {
        let fft = FftProcessor::new(8);
        assert_eq!(fft.window[0], 0.0);
        assert!((fft.window[4] - 1.0).abs() < 1e-6);
        assert!((fft.window[2] - fft.window[6]).abs() < 1e-6);
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let n_fft = 1024;
        let sample_rate = 8_000.0;
        let freq = 1_000.0;
        let audio: Vec<f32> = (0..8_000)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect();

        let fft = FftProcessor::new(n_fft);
        let power = fft.power_spectrogram(&audio, 256);
        assert_eq!(power.dim(), (513, 1 + 8_000 / 256));

        let middle = power.column(power.ncols() / 2);
        let peak = middle
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0;
        let expected = (freq / sample_rate * n_fft as f32).round() as usize;
        assert_eq!(peak, expected);
    }

    #[test]
    fn test_silence_has_zero_power() {
        let fft = FftProcessor::new(256);
        let power = fft.power_spectrogram(&[0.0; 1_000], 64);
        assert!(power.iter().all(|&v| v == 0.0));
    }
}
