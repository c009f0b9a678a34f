// Recording session: Idle -> Recording <-> Paused -> Stopping -> Finished(clip).
// The writer thread finishes the file after stop() returns; its single result
// arrives through poll_completion()/wait_completion().

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use tracing::{info, warn};

use super::clip::AudioClip;
use crate::audio::{self, CaptureSink, CaptureStream, InputSource, TakeResult};
use crate::error::{AudioError, Result};

const NAME_FORMAT: &str = "%d%m%Y-%H%M%S";
const EXTENSION: &str = "wav";

#[derive(Clone, Debug)]
pub struct RecorderSettings {
    pub dir: PathBuf,
    pub allow_pause: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingPhase {
    Idle,
    Recording,
    Paused,
    Stopping,
    Finished,
}

impl RecordingPhase {
    fn name(self) -> &'static str {
        match self {
            RecordingPhase::Idle => "idle",
            RecordingPhase::Recording => "recording",
            RecordingPhase::Paused => "paused",
            RecordingPhase::Stopping => "stopping",
            RecordingPhase::Finished => "finished",
        }
    }
}

// the writer side of a take, alive from start until the result comes back
struct Take {
    path: PathBuf,
    done_rx: Receiver<TakeResult>,
    join: JoinHandle<()>,
}

enum Session {
    Idle,
    Live {
        take: Take,
        sink: CaptureSink,
        stream: Box<dyn CaptureStream>,
        paused: bool,
    },
    Stopping(Take),
    Finished(AudioClip),
}

pub struct Recorder<S: InputSource> {
    source: S,
    settings: RecorderSettings,
    session: Session,
}

impl<S: InputSource> Recorder<S> {
    pub fn new(source: S, settings: RecorderSettings) -> Self {
        Self { source, settings, session: Session::Idle }
    }

    pub fn phase(&self) -> RecordingPhase {
        match &self.session {
            Session::Idle => RecordingPhase::Idle,
            Session::Live { paused: false, .. } => RecordingPhase::Recording,
            Session::Live { paused: true, .. } => RecordingPhase::Paused,
            Session::Stopping(_) => RecordingPhase::Stopping,
            Session::Finished(_) => RecordingPhase::Finished,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    fn invalid(&self, op: &'static str) -> AudioError {
        AudioError::InvalidState { op, state: self.phase().name() }
    }

    pub fn start_recording(&mut self) -> Result<PathBuf> {
        self.start_recording_at(Local::now())
    }

    pub fn start_recording_at(&mut self, now: DateTime<Local>) -> Result<PathBuf> {
        match self.session {
            Session::Idle => {}
            Session::Finished(_) => {
                // an untaken clip is superseded; it was never handed to anyone
                if let Session::Finished(old) = std::mem::replace(&mut self.session, Session::Idle) {
                    warn!(title = old.title(), "discarding unclaimed clip");
                    old.discard()?;
                }
            }
            _ => return Err(self.invalid("start recording")),
        }

        std::fs::create_dir_all(&self.settings.dir).map_err(|e| AudioError::storage(&self.settings.dir, e))?;
        let path = unique_path(&self.settings.dir, now);

        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = CaptureSink::new(tx);
        let stream = self.source.open(sink.clone())?;
        let sample_rate = stream.sample_rate();

        let writer = match hound::WavWriter::create(&path, audio::wav_spec(sample_rate)) {
            Ok(w) => w,
            Err(e) => {
                drop(stream);
                let _ = std::fs::remove_file(&path); // may have been created before the header write failed
                return Err(AudioError::from_wav(&path, e));
            }
        };

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let join = audio::spawn_writer(writer, path.clone(), sample_rate, rx, done_tx);

        info!(path = %path.display(), sample_rate, "recording started");
        self.session = Session::Live {
            take: Take { path: path.clone(), done_rx, join },
            sink,
            stream,
            paused: false,
        };
        Ok(path)
    }

    pub fn pause(&mut self) -> Result<()> {
        if !self.settings.allow_pause {
            return Err(AudioError::InvalidState { op: "pause", state: "pausing is disabled" });
        }
        match &mut self.session {
            Session::Live { sink, paused, .. } if !*paused => {
                sink.set_paused(true);
                *paused = true;
                info!("recording paused");
                Ok(())
            }
            _ => Err(self.invalid("pause")),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match &mut self.session {
            Session::Live { sink, paused, .. } if *paused => {
                sink.set_paused(false);
                *paused = false;
                info!("recording resumed");
                Ok(())
            }
            _ => Err(self.invalid("resume")),
        }
    }

    // Close the input and ask the writer to finish. The file is not complete
    // until a completion arrives.
    pub fn stop(&mut self) -> Result<()> {
        if !matches!(self.session, Session::Live { .. }) {
            return Err(self.invalid("stop"));
        }
        if let Session::Live { take, sink, stream, .. } = std::mem::replace(&mut self.session, Session::Idle) {
            drop(stream); // no more chunks after this
            sink.finish();
            info!(path = %take.path.display(), "recording stopping");
            self.session = Session::Stopping(take);
        }
        Ok(())
    }

    // Non-blocking check for the writer's result. `None` while still
    // finishing (or when nothing is pending).
    pub fn poll_completion(&mut self) -> Option<Result<&AudioClip>> {
        let Session::Stopping(take) = &self.session else {
            return None;
        };
        let result = match take.done_rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(writer_vanished()),
        };
        Some(self.complete(result))
    }

    // Block until the writer reports, at most `timeout`.
    pub fn wait_completion(&mut self, timeout: Duration) -> Option<Result<&AudioClip>> {
        let Session::Stopping(take) = &self.session else {
            return None;
        };
        let result = match take.done_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(writer_vanished()),
        };
        Some(self.complete(result))
    }

    fn complete(&mut self, result: TakeResult) -> Result<&AudioClip> {
        let take = match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Stopping(take) => take,
            other => {
                self.session = other;
                return Err(self.invalid("complete"));
            }
        };
        let _ = take.join.join();

        match result {
            Ok(written) => {
                let clip = AudioClip::recorded(written.path, written.sample_rate, written.frames);
                info!(title = clip.title(), seconds = clip.duration().as_secs_f32(), "recording finished");
                self.session = Session::Finished(clip);
                match &self.session {
                    Session::Finished(clip) => Ok(clip),
                    _ => Err(self.invalid("complete")),
                }
            }
            Err(e) => {
                // no partial take stays loadable
                if let Err(rm) = std::fs::remove_file(&take.path) {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %take.path.display(), "could not remove failed take: {rm}");
                    }
                }
                Err(e)
            }
        }
    }

    // Move the finished clip out; the recorder is Idle afterwards.
    pub fn take_clip(&mut self) -> Option<AudioClip> {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Finished(clip) => Some(clip),
            other => {
                self.session = other;
                None
            }
        }
    }
}

fn writer_vanished() -> AudioError {
    AudioError::StorageFailure {
        path: PathBuf::new(),
        source: std::io::Error::other("recording writer exited without a result"),
    }
}

// <dir>/DDMMYYYY-HHMMSS.wav, or -1, -2, ... when that second is taken
fn unique_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = now.format(NAME_FORMAT).to_string();
    let mut path = dir.join(format!("{stem}.{EXTENSION}"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{n}.{EXTENSION}"));
        n += 1;
    }
    path
}
