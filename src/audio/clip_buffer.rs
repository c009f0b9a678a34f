use std::path::Path;

use super::frame::StereoFrame;
use crate::error::{AudioError, Result};

// A recorded clip decoded into memory at the engine's rate, ready to be handed
// to the audio thread.
#[derive(Clone, Debug)]
pub struct ClipBuffer {
    pub data: Vec<StereoFrame>,
    pub sample_rate: u32,
}

impl ClipBuffer {
    pub fn from_frames(data: Vec<StereoFrame>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Load a WAV file from disk, converting to stereo at the target rate
    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| AudioError::from_wav(path, e))?;
        let spec = reader.spec();
        let file_channels = spec.channels.max(1) as usize;

        let samples = read_samples(reader, spec).map_err(|e| AudioError::from_wav(path, e))?;

        let mut frames: Vec<StereoFrame> = if file_channels == 1 {
            samples.into_iter().map(StereoFrame::mono).collect() // mono, duplicate
        } else {
            samples
                .chunks_exact(file_channels)
                .map(|c| StereoFrame { left: c[0], right: c[1] }) // extra channels are ignored
                .collect()
        };

        if spec.sample_rate != target_rate {
            frames = resample_linear(&frames, spec.sample_rate, target_rate);
        }

        Ok(Self { data: frames, sample_rate: target_rate })
    }
}

fn read_samples<R: std::io::Read>(
    mut reader: hound::WavReader<R>,
    spec: hound::WavSpec,
) -> std::result::Result<Vec<f32>, hound::Error> {
    match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(), // float, just pass it through
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|x| x as f32 / max))
                .collect()
        }
        #[allow(unreachable_patterns)]
        _ => Err(hound::Error::Unsupported),
    }
}

pub(crate) fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        // fractional position in the source buffer
        let src_pos = i as f64 / ratio; // ex. 3.7
        let idx = src_pos.floor() as usize; // ex. 3
        let frac = (src_pos - idx as f64) as f32; // ex. 0.7
        if idx >= frames.len() - 1 {
            out.push(frames[frames.len() - 1]);
        } else {
            out.push(StereoFrame::lerp(frames[idx], frames[idx + 1], frac));
        }
    }
    out
}
