use std::sync::Arc;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, warn};

use crate::error::{AudioError, Result};

mod capture;
mod clip_buffer;
mod effect;
mod engine;
mod frame;
mod output;
mod voice;

pub use capture::{
    spawn_writer, wav_spec, CaptureMsg, CaptureSink, CaptureStream, InputSource, ManualSource,
    TakeResult, WrittenTake,
};
pub use clip_buffer::ClipBuffer;
pub use effect::{Effect, EffectSpec};
pub use engine::{Engine, EngineCommand, EngineStatus, Pipeline, PipelineEvent};
pub use frame::StereoFrame;
pub use output::{AudioOutput, OfflineOutput};
pub use voice::Voice;

const SCRATCH_FRAMES: usize = 4096;

fn device_err(context: &str, err: impl std::fmt::Display) -> AudioError {
    AudioError::DeviceUnavailable(format!("{context}: {err}"))
}

// ── Output stream ─────────────────────────────────────────────────

pub struct CpalOutput {
    tx: Sender<EngineCommand>,
    events_rx: Receiver<PipelineEvent>,
    status: Arc<EngineStatus>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.tx
            .try_send(cmd)
            .map_err(|e| AudioError::EngineStartFailure(e.to_string()))
    }

    fn status(&self) -> &EngineStatus {
        &self.status
    }

    fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events_rx
    }
}

pub fn open_output() -> Result<CpalOutput> {
    let (tx, rx) = crossbeam_channel::bounded::<EngineCommand>(64);
    let (events_tx, events_rx) = crossbeam_channel::bounded::<PipelineEvent>(256);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceUnavailable("no default output device".into()))?;
    let config = device
        .default_output_config()
        .map_err(|e| device_err("no default output config", e))?;

    let sample_rate: u32 = config.sample_rate();
    let channels = config.channels() as usize;

    let status = Arc::new(EngineStatus::default());
    let mut engine = Engine::new(Arc::clone(&status));
    engine.set_events_tx(events_tx);

    let output_stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_output_stream_f32(&device, &config.into(), rx, engine, channels)?,
        other => return Err(AudioError::DeviceUnavailable(format!(
            "unsupported output sample format {other:?} (only f32 supported for now)"
        ))),
    };
    output_stream
        .play()
        .map_err(|e| device_err("failed to play output stream", e))?;

    info!(sample_rate, channels, "output stream running");
    Ok(CpalOutput {
        tx,
        events_rx,
        status,
        sample_rate,
        _output_stream: output_stream,
    })
}

pub const OFFLINE_RATE: u32 = 44_100;

// The output the app ends up with: the sound card, or a silent offline engine
// when there is none.
pub enum Output {
    Device(CpalOutput),
    Offline(OfflineOutput),
}

impl Output {
    pub fn is_offline(&self) -> bool {
        matches!(self, Output::Offline(_))
    }

    fn inner(&self) -> &dyn AudioOutput {
        match self {
            Output::Device(out) => out,
            Output::Offline(out) => out,
        }
    }
}

impl AudioOutput for Output {
    fn sample_rate(&self) -> u32 {
        self.inner().sample_rate()
    }

    fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.inner().send(cmd)
    }

    fn status(&self) -> &EngineStatus {
        self.inner().status()
    }

    fn events(&self) -> &Receiver<PipelineEvent> {
        self.inner().events()
    }
}

// Only a missing device falls back; a device that exists but fails is still an error.
pub fn output_or_offline(opened: Result<CpalOutput>, fallback_rate: u32) -> Result<Output> {
    match opened {
        Ok(out) => Ok(Output::Device(out)),
        Err(AudioError::DeviceUnavailable(msg)) => {
            warn!(reason = %msg, sample_rate = fallback_rate, "no output device, playing offline");
            Ok(Output::Offline(OfflineOutput::new(fallback_rate)))
        }
        Err(e) => Err(e),
    }
}

pub fn open_output_or_offline() -> Result<Output> {
    output_or_offline(open_output(), OFFLINE_RATE)
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<EngineCommand>,
    mut engine: Engine,
    channels: usize,
) -> Result<cpal::Stream> {
    let err_fn = |err| error!("audio output stream error: {err}");
    let mut scratch = vec![StereoFrame::zero(); SCRATCH_FRAMES];

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info| {
                while let Ok(cmd) = rx.try_recv() {
                    engine.handle_cmd(cmd);
                }

                let n_frames = data.len() / channels.max(1);
                if scratch.len() < n_frames {
                    scratch.resize(n_frames, StereoFrame::zero()); // only if the host grows its buffer
                }
                let frames = &mut scratch[..n_frames];
                engine.render_block(frames);

                for (out, f) in data.chunks_exact_mut(channels.max(1)).zip(frames.iter()) {
                    match out {
                        [mono] => *mono = 0.5 * (f.left + f.right),
                        [l, r, rest @ ..] => {
                            *l = f.left;
                            *r = f.right;
                            rest.fill(0.0);
                        }
                        [] => {}
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| device_err("failed to build output stream", e))
}

// ── Input stream ──────────────────────────────────────────────────

// The default microphone.
pub struct CpalInput {
    host: cpal::Host,
}

impl CpalInput {
    pub fn new() -> Self {
        Self { host: cpal::default_host() }
    }
}

impl Default for CpalInput {
    fn default() -> Self {
        Self::new()
    }
}

struct CpalCapture {
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl CaptureStream for CpalCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl InputSource for CpalInput {
    fn open(&mut self, sink: CaptureSink) -> Result<Box<dyn CaptureStream>> {
        let device = self
            .host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default input device".into()))?;
        let supported = device
            .default_input_config()
            .map_err(|e| device_err("no default input config", e))?;

        let sample_rate: u32 = supported.sample_rate();
        let channels = supported.channels() as usize;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let stream = match format {
            cpal::SampleFormat::F32 => build_input_stream(&device, &config, channels, sink, |s: f32| s)?,
            cpal::SampleFormat::I16 => {
                build_input_stream(&device, &config, channels, sink, |s: i16| s as f32 / i16::MAX as f32)?
            }
            cpal::SampleFormat::U16 => {
                build_input_stream(&device, &config, channels, sink, |s: u16| (s as f32 - 32_768.0) / 32_768.0)?
            }
            other => return Err(AudioError::DeviceUnavailable(format!("unsupported input sample format {other:?}"))),
        };
        stream
            .play()
            .map_err(|e| device_err("could not start input stream", e))?;

        info!(sample_rate, channels, "input stream running");
        Ok(Box::new(CpalCapture { sample_rate, _stream: stream }))
    }
}

fn build_input_stream<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sink: CaptureSink,
    to_f32: F,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + Send + 'static,
    F: Fn(T) -> f32 + Send + 'static,
{
    let channels = channels.max(1);
    let err_sink = sink.clone();
    let err_fn = move |err: cpal::StreamError| {
        error!("audio input stream error: {err}");
        err_sink.fail(err.to_string());
    };

    device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                // downmix to mono
                let mono: Vec<f32> = data
                    .chunks_exact(channels)
                    .map(|c| c.iter().map(|&s| to_f32(s)).sum::<f32>() / channels as f32)
                    .collect();
                sink.push(mono);
            },
            err_fn,
            None,
        )
        .map_err(|e| device_err("failed to build input stream", e))
}

// Default device rates without opening any stream, for the startup log line.
pub fn describe_devices() -> anyhow::Result<(u32, u32)> {
    let host = cpal::default_host();
    let output = host.default_output_device().context("no default output device")?;
    let input = host.default_input_device().context("no default input device")?;
    let out_rate: u32 = output.default_output_config().context("no default output config")?.sample_rate();
    let in_rate: u32 = input.default_input_config().context("no default input config")?.sample_rate();
    Ok((in_rate, out_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_falls_back_to_offline() {
        let out = output_or_offline(Err(AudioError::DeviceUnavailable("no default output device".into())), OFFLINE_RATE)
            .unwrap();
        assert!(out.is_offline());
        assert_eq!(out.sample_rate(), 44_100);
        assert_eq!(out.status().active_pipelines(), 0);
        assert!(out.events().try_recv().is_err());
    }

    #[test]
    fn other_output_errors_still_fail() {
        let res = output_or_offline(Err(AudioError::EngineStartFailure("stream died".into())), OFFLINE_RATE);
        assert!(matches!(res, Err(AudioError::EngineStartFailure(_))));
    }
}
