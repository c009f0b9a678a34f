// Microphone side: input sources push mono chunks through a CaptureSink, a
// writer thread drains them into a WAV file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::error::{AudioError, Result};

pub enum CaptureMsg {
    Chunk(Vec<f32>),
    StreamError(String),
    Finish,
}

// Handed to an input source. Chunks pushed while the gate is paused are
// dropped on the spot, so nothing captured during a pause reaches the file.
#[derive(Clone)]
pub struct CaptureSink {
    tx: Sender<CaptureMsg>,
    paused: Arc<AtomicBool>,
}

impl CaptureSink {
    pub fn new(tx: Sender<CaptureMsg>) -> Self {
        Self { tx, paused: Arc::new(AtomicBool::new(false)) }
    }

    pub fn push(&self, chunk: Vec<f32>) {
        if self.paused.load(Ordering::Acquire) {
            return;
        }
        let _ = self.tx.send(CaptureMsg::Chunk(chunk));
    }

    // called from a stream's error callback; the take is lost
    pub fn fail(&self, message: impl Into<String>) {
        let _ = self.tx.send(CaptureMsg::StreamError(message.into()));
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub(crate) fn finish(&self) {
        let _ = self.tx.send(CaptureMsg::Finish);
    }
}

// A live capture. Dropping it stops delivery.
pub trait CaptureStream {
    fn sample_rate(&self) -> u32;
}

pub trait InputSource {
    fn open(&mut self, sink: CaptureSink) -> Result<Box<dyn CaptureStream>>;
}

// -- writer thread --

#[derive(Debug)]
pub struct WrittenTake {
    pub path: PathBuf,
    pub frames: u64,
    pub sample_rate: u32,
}

pub type TakeResult = Result<WrittenTake>;

pub fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

// Owns the WAV writer until Finish arrives, then reports exactly once on `done`.
pub fn spawn_writer(
    writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    path: PathBuf,
    sample_rate: u32,
    rx: Receiver<CaptureMsg>,
    done: Sender<TakeResult>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let result = drain_into(writer, &path, sample_rate, &rx);
        match &result {
            Ok(take) => debug!(path = %take.path.display(), frames = take.frames, "take written"),
            Err(e) => warn!("recording failed: {e}"),
        }
        let _ = done.send(result);
    })
}

fn drain_into(
    mut writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    path: &std::path::Path,
    sample_rate: u32,
    rx: &Receiver<CaptureMsg>,
) -> TakeResult {
    let mut frames: u64 = 0;
    let mut failure: Option<AudioError> = None;

    // keep draining after a failure so the sender side never blocks on us
    for msg in rx.iter() {
        match msg {
            CaptureMsg::Chunk(chunk) => {
                if failure.is_some() {
                    continue;
                }
                for s in chunk {
                    let sample = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    if let Err(e) = writer.write_sample(sample) {
                        failure = Some(AudioError::from_wav(path, e));
                        break;
                    }
                    frames += 1;
                }
            }
            CaptureMsg::StreamError(message) => {
                failure.get_or_insert(AudioError::DeviceUnavailable(message));
            }
            CaptureMsg::Finish => break,
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }
    writer.finalize().map_err(|e| AudioError::from_wav(path, e))?;
    Ok(WrittenTake { path: path.to_path_buf(), frames, sample_rate })
}

// -- scripted source --

// An input source fed by hand through `push`. Stands in for a
// microphone when there is none.
#[derive(Clone)]
pub struct ManualSource {
    sample_rate: u32,
    available: bool,
    sink: Arc<Mutex<Option<CaptureSink>>>,
}

struct ManualStream {
    sample_rate: u32,
    sink: Arc<Mutex<Option<CaptureSink>>>,
}

impl ManualSource {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, available: true, sink: Arc::new(Mutex::new(None)) }
    }

    // A source whose device can never be opened.
    pub fn unavailable(sample_rate: u32) -> Self {
        Self { available: false, ..Self::new(sample_rate) }
    }

    fn current(&self) -> Option<CaptureSink> {
        self.sink.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    // Deliver samples as if the device had captured them. Returns false when
    // no stream is open.
    pub fn push(&self, samples: &[f32]) -> bool {
        match self.current() {
            Some(sink) => {
                sink.push(samples.to_vec());
                true
            }
            None => false,
        }
    }

    pub fn fail(&self, message: &str) -> bool {
        match self.current() {
            Some(sink) => {
                sink.fail(message);
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.current().is_some()
    }
}

impl InputSource for ManualSource {
    fn open(&mut self, sink: CaptureSink) -> Result<Box<dyn CaptureStream>> {
        if !self.available {
            return Err(AudioError::DeviceUnavailable("no input device".into()));
        }
        *self.sink.lock().unwrap_or_else(|p| p.into_inner()) = Some(sink);
        Ok(Box::new(ManualStream { sample_rate: self.sample_rate, sink: Arc::clone(&self.sink) }))
    }
}

impl CaptureStream for ManualStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for ManualStream {
    fn drop(&mut self) {
        *self.sink.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}
