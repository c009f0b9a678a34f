// End-to-end record -> load -> play runs with a hand-fed microphone and the
// offline engine. No sound hardware involved.

use std::path::Path;
use std::time::Duration;

use chrono::{Local, TimeZone};
use crossbeam_channel::Receiver;

use pitchperfect::audio::{
    AudioOutput, EngineCommand, EngineStatus, ManualSource, OfflineOutput, PipelineEvent,
};
use pitchperfect::effect_kind::EffectKind;
use pitchperfect::error::AudioError;
use pitchperfect::session::{
    AudioClip, EffectPlayer, PlaybackSettings, PlaybackState, Recorder, RecorderSettings,
    RecordingPhase, Selection,
};

const RATE: u32 = 8000;
const WAIT: Duration = Duration::from_secs(5);

fn recorder(dir: &Path) -> Recorder<ManualSource> {
    Recorder::new(
        ManualSource::new(RATE),
        RecorderSettings { dir: dir.to_path_buf(), allow_pause: true },
    )
}

fn record(dir: &Path, seconds: usize) -> AudioClip {
    let mut rec = recorder(dir);
    rec.start_recording().unwrap();
    for _ in 0..seconds {
        assert!(rec.source().push(&vec![0.25; RATE as usize]));
    }
    rec.stop().unwrap();
    rec.wait_completion(WAIT).unwrap().unwrap();
    rec.take_clip().unwrap()
}

#[test]
fn five_seconds_recorded_at_a_known_time() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    let t = Local.with_ymd_and_hms(2026, 10, 16, 14, 25, 1).unwrap();

    let path = rec.start_recording_at(t).unwrap();
    for _ in 0..5 {
        assert!(rec.source().push(&vec![0.5; RATE as usize]));
    }
    rec.stop().unwrap();

    let clip = rec.wait_completion(WAIT).unwrap().unwrap();
    assert_eq!(clip.title(), "16102026-142501");
    assert_eq!(clip.path(), path.as_path());
    assert_eq!(clip.frames(), 5 * RATE as u64);
    assert_eq!(clip.duration(), Duration::from_secs(5));
    assert_eq!(rec.phase(), RecordingPhase::Finished);

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, RATE);
    assert_eq!(reader.duration(), 5 * RATE);
}

#[test]
fn slow_then_fast_releases_slow_before_starting_fast() {
    let dir = tempfile::tempdir().unwrap();
    let mut player = EffectPlayer::new(OfflineOutput::new(RATE), PlaybackSettings::default());
    player.load(record(dir.path(), 1)).unwrap();

    player.play(EffectKind::Slow).unwrap();
    player.play(EffectKind::Fast).unwrap();

    let events: Vec<PipelineEvent> = player.output().events().try_iter().collect();
    assert_eq!(
        events,
        vec![
            PipelineEvent::Started { generation: 1, label: "SLOW".into() },
            PipelineEvent::Released { generation: 1, label: "SLOW".into() },
            PipelineEvent::Started { generation: 2, label: "FAST".into() },
        ]
    );
    assert_eq!(player.output().status().active_pipelines(), 1);
    assert_eq!(player.state(), PlaybackState::Playing(Selection::Effect(EffectKind::Fast)));

    // 8000 frames at 1.5x
    let rendered = player.output().render_until_idle(1, 100_000);
    assert_eq!(rendered.len(), 5334);
}

#[test]
fn repeated_plays_never_stack_pipelines() {
    let dir = tempfile::tempdir().unwrap();
    let mut player = EffectPlayer::new(OfflineOutput::new(RATE), PlaybackSettings::default());
    player.load(record(dir.path(), 1)).unwrap();

    for kind in EffectKind::ALL {
        player.play(kind).unwrap();
        player.play(kind).unwrap();
        assert_eq!(player.output().status().active_pipelines(), 1);
    }
    player.play_pass_through().unwrap();
    assert_eq!(player.output().status().active_pipelines(), 1);
}

#[test]
fn pass_through_renders_the_clip_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let clip = record(dir.path(), 5);
    let frames = clip.frames() as usize;

    let mut player = EffectPlayer::new(OfflineOutput::new(RATE), PlaybackSettings::default());
    player.load(clip).unwrap();
    assert_eq!(player.clip_frames(), frames);
    player.play_pass_through().unwrap();

    let rendered = player.output().render_until_idle(500, 1_000_000);
    assert_eq!(rendered.len(), frames);
    assert!(rendered.iter().all(|f| (f.left - 0.25).abs() < 1e-3 && (f.right - 0.25).abs() < 1e-3));
    assert!(player.refresh());
    assert_eq!(player.state(), PlaybackState::Loaded);
}

#[test]
fn failed_stream_leaves_no_clip_and_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    rec.start_recording().unwrap();
    rec.source().push(&[0.1; 400]);
    assert!(rec.source().fail("microphone unplugged"));
    rec.stop().unwrap();

    let err = rec.wait_completion(WAIT).unwrap().unwrap_err();
    assert!(matches!(err, AudioError::DeviceUnavailable(ref msg) if msg.contains("unplugged")));
    assert_eq!(rec.phase(), RecordingPhase::Idle);
    assert!(rec.take_clip().is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn audio_pushed_while_paused_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    rec.start_recording().unwrap();
    rec.source().push(&[0.1; 1000]);
    rec.pause().unwrap();
    rec.source().push(&[0.9; 3000]);
    rec.resume().unwrap();
    rec.source().push(&[0.1; 500]);
    rec.stop().unwrap();

    let clip = rec.wait_completion(WAIT).unwrap().unwrap();
    assert_eq!(clip.frames(), 1500);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

// an engine whose command queue refuses new pipelines
struct DeadOutput {
    status: EngineStatus,
    events: Receiver<PipelineEvent>,
}

impl AudioOutput for DeadOutput {
    fn sample_rate(&self) -> u32 {
        RATE
    }

    fn send(&self, cmd: EngineCommand) -> pitchperfect::error::Result<()> {
        match cmd {
            EngineCommand::Start(_) => Err(AudioError::EngineStartFailure("queue full".into())),
            _ => Ok(()),
        }
    }

    fn status(&self) -> &EngineStatus {
        &self.status
    }

    fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }
}

#[test]
fn engine_start_failure_leaves_clip_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let output = DeadOutput { status: EngineStatus::default(), events: crossbeam_channel::never() };
    let mut player = EffectPlayer::new(output, PlaybackSettings::default());
    player.load(record(dir.path(), 1)).unwrap();

    let err = player.play(EffectKind::Reverb).unwrap_err();
    assert!(matches!(err, AudioError::EngineStartFailure(_)));
    assert_eq!(player.state(), PlaybackState::Loaded);
    assert!(player.clip().is_some());
}
