// Playback session: Idle -> Loaded -> Playing(selection) -> Loaded.
// Each play() replaces whatever was playing; the engine releases the old
// pipeline before it installs the new one.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::clip::AudioClip;
use crate::audio::{AudioOutput, ClipBuffer, EffectSpec, EngineCommand, Pipeline, PipelineEvent};
use crate::effect_kind::{CustomSettings, EffectKind, EffectParam, EffectTable};
use crate::error::{AudioError, Result};

#[derive(Clone, Debug)]
pub struct PlaybackSettings {
    pub effects: EffectTable,
    pub reverb_decay_seconds: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub keep_recordings: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            effects: EffectTable::default(),
            reverb_decay_seconds: 3.0,
            delay_feedback: 0.5,
            delay_mix: 50.0,
            keep_recordings: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection {
    PassThrough,
    Effect(EffectKind),
    Custom(CustomSettings),
}

impl Selection {
    pub fn label(&self) -> &'static str {
        match self {
            Selection::PassThrough => "ORIGINAL",
            Selection::Effect(kind) => kind.label(),
            Selection::Custom(_) => "CUSTOM",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackState {
    Idle,
    Loaded,
    Playing(Selection),
}

impl PlaybackState {
    fn name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "no clip is loaded",
            PlaybackState::Loaded => "loaded",
            PlaybackState::Playing(_) => "playing",
        }
    }
}

pub struct EffectPlayer<O: AudioOutput> {
    output: O,
    settings: PlaybackSettings,
    clip: Option<AudioClip>,
    clip_frames: usize,
    state: PlaybackState,
    starts_sent: u64,
}

impl<O: AudioOutput> EffectPlayer<O> {
    pub fn new(output: O, settings: PlaybackSettings) -> Self {
        Self {
            output,
            settings,
            clip: None,
            clip_frames: 0,
            state: PlaybackState::Idle,
            starts_sent: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    // Frames of the loaded clip at the output rate.
    pub fn clip_frames(&self) -> usize {
        self.clip_frames
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn load(&mut self, clip: AudioClip) -> Result<()> {
        if self.clip.is_some() {
            self.unload()?;
        }
        if !clip.is_valid() {
            let path = clip.path().to_path_buf();
            return Err(AudioError::storage(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "clip is not a finished recording"),
            ));
        }

        let loaded = ClipBuffer::load_wav(clip.path(), self.output.sample_rate())
            .and_then(|buffer| {
                let frames = buffer.len();
                self.output.send(EngineCommand::Load(Arc::new(buffer)))?;
                Ok(frames)
            });
        match loaded {
            Ok(frames) => {
                info!(title = clip.title(), frames, "clip loaded");
                self.clip_frames = frames;
                self.clip = Some(clip);
                self.state = PlaybackState::Loaded;
                Ok(())
            }
            Err(e) => {
                // unplayable; apply the same lifecycle as leaving the screen
                if let Err(rm) = self.release(clip) {
                    warn!("could not release unplayable clip: {rm}");
                }
                Err(e)
            }
        }
    }

    pub fn play(&mut self, kind: EffectKind) -> Result<()> {
        let param = self.settings.effects.param(kind);
        param.validate()?;
        let sr = self.output.sample_rate();
        let label = kind.label();

        let pipeline = match param {
            // strategy (a): variable-speed source, no effect stage
            EffectParam::Rate(rate) => Pipeline::new(label, rate, vec![]),
            // strategy (b): source -> one effect stage -> output
            EffectParam::PitchCents(cents) => {
                Pipeline::new(label, 1.0, vec![EffectSpec::PitchShift { cents }.to_effect(sr)])
            }
            EffectParam::WetDryMix(mix) => {
                let spec = EffectSpec::Reverb { mix, decay_seconds: self.settings.reverb_decay_seconds };
                Pipeline::new(label, 1.0, vec![spec.to_effect(sr)])
            }
            EffectParam::DelaySeconds(seconds) => {
                let spec = EffectSpec::Delay {
                    seconds,
                    feedback: self.settings.delay_feedback,
                    mix: self.settings.delay_mix,
                };
                Pipeline::new(label, 1.0, vec![spec.to_effect(sr)])
            }
        };
        self.start(Selection::Effect(kind), pipeline)
    }

    pub fn play_pass_through(&mut self) -> Result<()> {
        let pipeline = Pipeline::new(Selection::PassThrough.label(), 1.0, vec![]);
        self.start(Selection::PassThrough, pipeline)
    }

    pub fn play_custom(&mut self, custom: CustomSettings) -> Result<()> {
        custom.validate()?;
        let sr = self.output.sample_rate();
        let mut effects = Vec::new();
        if custom.pitch_cents != 0.0 {
            effects.push(EffectSpec::PitchShift { cents: custom.pitch_cents }.to_effect(sr));
        }
        if custom.mix > 0.0 {
            effects.push(EffectSpec::Distortion { drive: custom.drive, mix: custom.mix }.to_effect(sr));
        }
        let pipeline = Pipeline::new(Selection::Custom(custom).label(), custom.rate, effects);
        self.start(Selection::Custom(custom), pipeline)
    }

    pub fn play_selection(&mut self, selection: Selection) -> Result<()> {
        match selection {
            Selection::PassThrough => self.play_pass_through(),
            Selection::Effect(kind) => self.play(kind),
            Selection::Custom(custom) => self.play_custom(custom),
        }
    }

    fn start(&mut self, selection: Selection, pipeline: Pipeline) -> Result<()> {
        if self.state == PlaybackState::Idle {
            return Err(AudioError::InvalidState { op: "play", state: self.state.name() });
        }
        self.stop();

        debug!(?pipeline, "starting pipeline");
        self.output.send(EngineCommand::Start(pipeline))?;
        self.starts_sent += 1;
        self.state = PlaybackState::Playing(selection);
        info!(effect = selection.label(), "playback started");
        Ok(())
    }

    // Halt playback. Does nothing unless something is playing.
    pub fn stop(&mut self) {
        if let PlaybackState::Playing(selection) = self.state {
            if let Err(e) = self.output.send(EngineCommand::Stop) {
                warn!("stop command not delivered: {e}");
            }
            self.state = PlaybackState::Loaded;
            info!(effect = selection.label(), "playback stopped");
        }
    }

    // Log pipeline lifecycle events and notice when playback ran out on its
    // own. Returns true when this call moved Playing -> Loaded.
    pub fn refresh(&mut self) -> bool {
        for event in self.output.events().try_iter() {
            match &event {
                PipelineEvent::Started { generation, label } => debug!(generation, label = %label, "pipeline started"),
                PipelineEvent::Released { generation, label } => debug!(generation, label = %label, "pipeline released"),
                PipelineEvent::Finished { generation, label } => debug!(generation, label = %label, "pipeline finished"),
            }
        }

        let status = self.output.status();
        let caught_up = status.generation() >= self.starts_sent;
        if matches!(self.state, PlaybackState::Playing(_)) && caught_up && status.active_pipelines() == 0 {
            self.state = PlaybackState::Loaded;
            info!("playback ended");
            return true;
        }
        false
    }

    // Stop, then release the clip: its file is deleted unless recordings are
    // kept, in which case the kept path is returned.
    pub fn unload(&mut self) -> Result<Option<PathBuf>> {
        self.stop();
        if let Err(e) = self.output.send(EngineCommand::Unload) {
            warn!("unload command not delivered: {e}");
        }
        self.state = PlaybackState::Idle;
        self.clip_frames = 0;
        match self.clip.take() {
            Some(clip) => self.release(clip),
            None => Ok(None),
        }
    }

    fn release(&self, clip: AudioClip) -> Result<Option<PathBuf>> {
        if self.settings.keep_recordings {
            info!(title = clip.title(), "clip kept");
            Ok(Some(clip.into_path()))
        } else {
            info!(title = clip.title(), "clip discarded");
            clip.discard()?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineOutput;

    fn clip_on_disk(dir: &std::path::Path, frames: usize, rate: u32) -> AudioClip {
        let path = dir.join("16102026-120000.wav");
        let mut w = hound::WavWriter::create(&path, crate::audio::wav_spec(rate)).unwrap();
        for i in 0..frames {
            w.write_sample(((i % 100) as i16) * 100).unwrap();
        }
        w.finalize().unwrap();
        AudioClip::recorded(path, rate, frames as u64)
    }

    fn player() -> EffectPlayer<OfflineOutput> {
        EffectPlayer::new(OfflineOutput::new(1000), PlaybackSettings::default())
    }

    #[test]
    fn play_requires_a_loaded_clip() {
        let mut p = player();
        assert!(matches!(p.play(EffectKind::Slow), Err(AudioError::InvalidState { .. })));
        assert_eq!(p.state(), PlaybackState::Idle);
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = player();
        p.stop();
        p.load(clip_on_disk(dir.path(), 100, 1000)).unwrap();
        p.stop();
        assert_eq!(p.state(), PlaybackState::Loaded);
        p.play(EffectKind::Reverb).unwrap();
        p.stop();
        p.stop();
        assert_eq!(p.state(), PlaybackState::Loaded);
        assert_eq!(p.output().status().active_pipelines(), 0);
    }

    #[test]
    fn slow_pipeline_runs_at_half_rate() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = player();
        p.load(clip_on_disk(dir.path(), 500, 1000)).unwrap();
        p.play(EffectKind::Slow).unwrap();
        let rendered = p.output().render_until_idle(100, 10_000);
        assert_eq!(rendered.len(), 1000);
        assert!(p.refresh());
        assert_eq!(p.state(), PlaybackState::Loaded);
    }

    #[test]
    fn refresh_keeps_playing_while_audio_remains() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = player();
        p.load(clip_on_disk(dir.path(), 500, 1000)).unwrap();
        p.play_pass_through().unwrap();
        p.output().render(100);
        assert!(!p.refresh());
        assert_eq!(p.state(), PlaybackState::Playing(Selection::PassThrough));
    }

    #[test]
    fn unload_deletes_the_file_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let clip = clip_on_disk(dir.path(), 100, 1000);
        let path = clip.path().to_path_buf();
        let mut p = player();
        p.load(clip).unwrap();
        p.play(EffectKind::Delay).unwrap();
        assert_eq!(p.unload().unwrap(), None);
        assert!(!path.exists());
        assert_eq!(p.state(), PlaybackState::Idle);
        assert!(p.play(EffectKind::Delay).is_err());
    }

    #[test]
    fn unload_keeps_the_file_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let clip = clip_on_disk(dir.path(), 100, 1000);
        let path = clip.path().to_path_buf();
        let settings = PlaybackSettings { keep_recordings: true, ..PlaybackSettings::default() };
        let mut p = EffectPlayer::new(OfflineOutput::new(1000), settings);
        p.load(clip).unwrap();
        assert_eq!(p.unload().unwrap(), Some(path.clone()));
        assert!(path.exists());
    }

    #[test]
    fn deleted_clip_cannot_be_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let clip = clip_on_disk(dir.path(), 100, 1000);
        std::fs::remove_file(clip.path()).unwrap();
        let mut p = player();
        assert!(matches!(p.load(clip), Err(AudioError::StorageFailure { .. })));
        assert_eq!(p.state(), PlaybackState::Idle);
    }

    #[test]
    fn out_of_range_table_entry_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = PlaybackSettings::default();
        settings.effects.chipmunk_cents = 5000.0;
        let mut p = EffectPlayer::new(OfflineOutput::new(1000), settings);
        p.load(clip_on_disk(dir.path(), 100, 1000)).unwrap();
        assert!(matches!(p.play(EffectKind::Chipmunk), Err(AudioError::InvalidParameter(_))));
        assert_eq!(p.state(), PlaybackState::Loaded);
    }

    #[test]
    fn custom_chain_builds_only_the_stages_it_needs() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = player();
        p.load(clip_on_disk(dir.path(), 200, 1000)).unwrap();
        let custom = CustomSettings { rate: 2.0, ..CustomSettings::default() };
        p.play_custom(custom).unwrap();
        // no stages means no tail: 200 frames at double speed
        assert_eq!(p.output().render_until_idle(10, 10_000).len(), 100);
        assert_eq!(p.state(), PlaybackState::Playing(Selection::Custom(custom)));
    }
}
