// Sample-rate conversion via rubato's FFT resampler

use rubato::{FftFixedIn, Resampler};

use crate::error::PipelineError;

/// Input frames handed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Resample mono audio from `src_rate` to `dst_rate`
///
/// The signal is streamed through in fixed chunks, the last one
/// zero-padded, then the resampler is flushed. The filter delay is cut
/// from the front and the result is trimmed or zero-padded to
/// `ceil(len * dst / src)` so downstream windowing sees the timing and
/// duration of the original file.
pub fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>, PipelineError> {
    if src_rate == 0 || dst_rate == 0 {
        return Err(PipelineError::InvalidInput {
            reason: format!("cannot resample {} Hz -> {} Hz", src_rate, dst_rate),
        });
    }
    if src_rate == dst_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(src_rate as usize, dst_rate as usize, CHUNK_FRAMES, 2, 1)
            .map_err(|err| PipelineError::InvalidInput {
                reason: format!("creating resampler: {}", err),
            })?;

    let delay = resampler.output_delay();
    let wanted = expected_len(samples.len(), src_rate, dst_rate);
    let mut resampled: Vec<f32> = Vec::with_capacity(delay + wanted + CHUNK_FRAMES);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let end = pos + resampler.input_frames_next();
        let chunk = [&samples[pos..end]];
        let output = resampler
            .process(&chunk[..], None)
            .map_err(resample_error)?;
        append_channel(&mut resampled, output);
        pos = end;
    }

    if pos < samples.len() {
        let rest = [&samples[pos..]];
        let output = resampler
            .process_partial(Some(&rest[..]), None)
            .map_err(resample_error)?;
        append_channel(&mut resampled, output);
    }

    let flush: Option<&[Vec<f32>]> = None;
    while resampled.len() < delay + wanted {
        let before = resampled.len();
        let output = resampler
            .process_partial(flush, None)
            .map_err(resample_error)?;
        append_channel(&mut resampled, output);
        if resampled.len() == before {
            break;
        }
    }

    let mut aligned = resampled.split_off(delay.min(resampled.len()));
    aligned.resize(wanted, 0.0);
    Ok(aligned)
}

/// Number of output samples for `len` input samples at the given rates.
pub fn expected_len(len: usize, src_rate: u32, dst_rate: u32) -> usize {
    let scaled = len as u64 * dst_rate as u64;
    scaled.div_ceil(src_rate as u64) as usize
}

fn append_channel(out: &mut Vec<f32>, channels: Vec<Vec<f32>>) {
    if let Some(first) = channels.into_iter().next() {
        out.extend(first);
    }
}

fn resample_error(err: rubato::ResampleError) -> PipelineError {
    PipelineError::InvalidInput {
        reason: format!("resampling: {}", err),
    }
}
