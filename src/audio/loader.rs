// AudioLoader - decode an audio file into a mono waveform at a fixed rate
//
// symphonia handles the container/codec side (wav, mp3, flac, ogg/vorbis).
// Channels are averaged per frame while decoding so multi-channel files
// never hold an interleaved copy of the whole file in memory.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::resample::resample;
use crate::error::PipelineError;

/// Single-channel audio at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// Load an audio file, fold it to one channel and resample to `target_rate`
///
/// # Arguments
/// * `path` - Audio file on disk; the extension is used as a probe hint
/// * `target_rate` - Output sample rate in Hz
/// * `mono` - Average all channels when true, otherwise keep the first channel
///
/// # Errors
/// * `PipelineError::Io` - the file cannot be opened
/// * `PipelineError::AudioDecode` - not a decodable audio container
pub fn load_waveform<P: AsRef<Path>>(
    path: P,
    target_rate: u32,
    mono: bool,
) -> Result<Waveform, PipelineError> {
    let path = path.as_ref();
    let (samples, source_rate) = decode_file(path, mono)?;

    debug!(
        path = %path.display(),
        source_rate,
        samples = samples.len(),
        "decoded audio"
    );

    let samples = if source_rate != target_rate && !samples.is_empty() {
        resample(&samples, source_rate, target_rate)?
    } else {
        samples
    };

    Ok(Waveform::new(samples, target_rate))
}

/// Decode every packet of the first audio track into folded mono samples.
fn decode_file(path: &Path, mono: bool) -> Result<(Vec<f32>, u32), PipelineError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::AudioDecode {
            reason: "no supported audio tracks".to_string(),
        })?;

    let track_id = track.id;
    let mut source_rate = track.codec_params.sample_rate;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(err) => return Err(decode_error(err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                source_rate.get_or_insert(spec.rate);

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                fold_channels(buffer.samples(), spec.channels.count(), mono, &mut samples);
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!("skipping undecodable packet: {}", reason);
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(err) => return Err(decode_error(err)),
        }
    }

    let source_rate = source_rate.ok_or_else(|| PipelineError::AudioDecode {
        reason: "unknown sample rate".to_string(),
    })?;

    Ok((samples, source_rate))
}

/// Append interleaved frames to `out` as a single channel.
///
/// With `mono` the channels are averaged; without it only the first
/// channel is kept.
pub(crate) fn fold_channels(interleaved: &[f32], channels: usize, mono: bool, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }

    out.extend(interleaved.chunks(channels).map(|frame| {
        if mono {
            frame.iter().sum::<f32>() / frame.len() as f32
        } else {
            frame[0]
        }
    }));
}

fn decode_error(err: SymphoniaError) -> PipelineError {
    PipelineError::AudioDecode {
        reason: err.to_string(),
    }
}
