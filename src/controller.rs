// Carries out the audio side of UiCommands against the recorder and the player,
// and turns what happened into feedback events for middle::transition.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::{AudioOutput, InputSource};
use crate::error::AudioError;
use crate::middle::{self, UiState};
use crate::session::{EffectPlayer, Recorder, RecordingPhase};
use crate::shared::{DisplayState, Event, UiCommand};

// how long a stop may take to flush before the take is given up on
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Controller<S: InputSource, O: AudioOutput> {
    recorder: Recorder<S>,
    player: EffectPlayer<O>,
}

impl<S: InputSource, O: AudioOutput> Controller<S, O> {
    pub fn new(recorder: Recorder<S>, player: EffectPlayer<O>) -> Self {
        Self { recorder, player }
    }

    pub fn recorder(&self) -> &Recorder<S> {
        &self.recorder
    }

    pub fn player(&self) -> &EffectPlayer<O> {
        &self.player
    }

    // Run one event through the state machine, apply display commands, execute
    // audio commands, and feed their results back in until nothing is left.
    // Returns true once a Quit command has come out.
    pub fn dispatch(&mut self, ui: &mut UiState, display: &mut DisplayState, event: Event) -> bool {
        let mut quit = false;
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let (next, cmds) = middle::transition(ui, event);
            *ui = next;
            for cmd in cmds {
                if cmd == UiCommand::Quit {
                    quit = true;
                } else if !display.apply(&cmd) {
                    queue.extend(self.execute(&cmd));
                }
            }
        }
        quit
    }

    pub fn execute(&mut self, cmd: &UiCommand) -> Vec<Event> {
        match cmd {
            UiCommand::StartRecording => match self.recorder.start_recording() {
                Ok(_) => vec![Event::RecordingStarted],
                Err(e) => vec![self.recording_failed(e)],
            },
            UiCommand::PauseRecording => match self.recorder.pause() {
                Ok(()) => vec![Event::RecordingPaused],
                Err(e) => vec![self.recording_failed(e)],
            },
            UiCommand::ResumeRecording => match self.recorder.resume() {
                Ok(()) => vec![Event::RecordingResumed],
                Err(e) => vec![self.recording_failed(e)],
            },
            // the result shows up later through poll()
            UiCommand::StopRecording => match self.recorder.stop() {
                Ok(()) => vec![],
                Err(e) => vec![self.recording_failed(e)],
            },
            UiCommand::LoadFinishedClip => {
                let Some(clip) = self.recorder.take_clip() else {
                    warn!("no finished recording to load");
                    return vec![Event::RecordingFailed("no finished recording".into())];
                };
                match self.player.load(clip) {
                    Ok(()) => vec![],
                    Err(e) => {
                        warn!("could not load recording: {e}");
                        vec![Event::RecordingFailed(e.to_string())]
                    }
                }
            }
            UiCommand::Play(selection) => match self.player.play_selection(*selection) {
                Ok(()) => vec![Event::PlaybackStarted(*selection)],
                Err(e) => {
                    warn!(effect = selection.label(), "playback failed: {e}");
                    vec![Event::PlaybackFailed(e.to_string())]
                }
            },
            UiCommand::StopPlayback => {
                self.player.stop();
                vec![]
            }
            UiCommand::UnloadClip => {
                match self.player.unload() {
                    Ok(Some(path)) => info!(path = %path.display(), "recording kept"),
                    Ok(None) => {}
                    Err(e) => warn!("could not discard recording: {e}"),
                }
                vec![]
            }
            _ => vec![],
        }
    }

    // Called once per tick: a finished (or failed) recording, and playback that
    // ran out on its own.
    pub fn poll(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let completion = self
            .recorder
            .poll_completion()
            .map(|result| result.map(|clip| clip.title().to_string()));
        match completion {
            Some(Ok(title)) => events.push(Event::RecordingFinished(title)),
            Some(Err(e)) => {
                warn!("recording failed: {e}");
                events.push(Event::RecordingFailed(e.to_string()));
            }
            None => {}
        }
        if self.player.refresh() {
            events.push(Event::PlaybackEnded);
        }
        events
    }

    // Release everything before exit. A take still in flight is flushed and
    // then handled like an unloaded clip.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.player.unload() {
            warn!("could not discard recording: {e}");
        }
        if matches!(self.recorder.phase(), RecordingPhase::Recording | RecordingPhase::Paused) {
            if let Err(e) = self.recorder.stop() {
                warn!("could not stop recording: {e}");
            }
        }
        if self.recorder.phase() == RecordingPhase::Stopping {
            if let Some(Err(e)) = self.recorder.wait_completion(FLUSH_TIMEOUT) {
                warn!("recording failed while shutting down: {e}");
            }
        }
        if let Some(clip) = self.recorder.take_clip() {
            if self.player.settings().keep_recordings {
                info!(title = clip.title(), "unplayed recording kept");
            } else if let Err(e) = clip.discard() {
                warn!("could not discard unplayed recording: {e}");
            }
        }
    }

    // a failed pause or resume must not leave a live take behind a reset screen
    fn recording_failed(&mut self, e: AudioError) -> Event {
        warn!("recording failed: {e}");
        if matches!(self.recorder.phase(), RecordingPhase::Recording | RecordingPhase::Paused) {
            self.abandon_recording();
        }
        Event::RecordingFailed(e.to_string())
    }

    fn abandon_recording(&mut self) {
        if self.recorder.stop().is_err() {
            return;
        }
        let _ = self.recorder.wait_completion(FLUSH_TIMEOUT);
        if let Some(clip) = self.recorder.take_clip() {
            if let Err(e) = clip.discard() {
                warn!("could not discard abandoned recording: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ManualSource, OfflineOutput};
    use crate::effect_kind::EffectKind;
    use crate::session::{PlaybackSettings, PlaybackState, RecorderSettings, Selection};
    use crate::shared::{Screen, TAP_TO_RECORD};

    const RATE: u32 = 8000;

    fn controller(
        dir: &std::path::Path,
        source: ManualSource,
        allow_pause: bool,
    ) -> Controller<ManualSource, OfflineOutput> {
        let recorder = Recorder::new(source, RecorderSettings { dir: dir.to_path_buf(), allow_pause });
        let player = EffectPlayer::new(OfflineOutput::new(RATE), PlaybackSettings::default());
        Controller::new(recorder, player)
    }

    // poll until the writer reports, feeding each event back through dispatch
    fn settle(c: &mut Controller<ManualSource, OfflineOutput>, ui: &mut UiState, ds: &mut DisplayState) {
        for _ in 0..200 {
            let events = c.poll();
            if events.is_empty() {
                std::thread::sleep(Duration::from_millis(5));
                continue;
            }
            for event in events {
                c.dispatch(ui, ds, event);
            }
            return;
        }
        panic!("recording never completed");
    }

    #[test]
    fn record_stop_play_back_flow() {
        let dir = tempfile::tempdir().unwrap();
        let mic = ManualSource::new(RATE);
        let mut c = controller(dir.path(), mic.clone(), true);
        let mut ui = UiState::new(true);
        let mut ds = DisplayState::default();

        assert!(!c.dispatch(&mut ui, &mut ds, Event::MicPressed));
        assert!(ds.blinking);
        assert!(mic.push(&vec![0.25; RATE as usize]));

        c.dispatch(&mut ui, &mut ds, Event::PauseStopPressed); // pause
        c.dispatch(&mut ui, &mut ds, Event::PauseStopPressed); // stop
        settle(&mut c, &mut ui, &mut ds);

        assert_eq!(ds.screen, Screen::Play);
        assert_eq!(c.player().state(), PlaybackState::Loaded);
        let title = ds.clip_title.clone().unwrap();

        c.dispatch(&mut ui, &mut ds, Event::EffectPressed(EffectKind::Fast));
        assert_eq!(ds.playing, Some(Selection::Effect(EffectKind::Fast)));

        c.dispatch(&mut ui, &mut ds, Event::Back);
        assert_eq!(ds.screen, Screen::Record);
        assert_eq!(ds.label, TAP_TO_RECORD);
        assert_eq!(c.player().state(), PlaybackState::Idle);
        assert!(!dir.path().join(format!("{title}.wav")).exists());
    }

    #[test]
    fn missing_microphone_resets_screen() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path(), ManualSource::unavailable(RATE), true);
        let mut ui = UiState::new(true);
        let mut ds = DisplayState::default();

        c.dispatch(&mut ui, &mut ds, Event::MicPressed);
        assert_eq!(ds.label, TAP_TO_RECORD);
        assert!(ds.record_enabled);
        assert!(!ds.status.is_empty());
        assert_eq!(c.recorder().phase(), RecordingPhase::Idle);
    }

    #[test]
    fn quit_mid_recording_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mic = ManualSource::new(RATE);
        let mut c = controller(dir.path(), mic.clone(), true);
        let mut ui = UiState::new(true);
        let mut ds = DisplayState::default();

        c.dispatch(&mut ui, &mut ds, Event::MicPressed);
        mic.push(&[0.1; 800]);
        assert!(c.dispatch(&mut ui, &mut ds, Event::Quit));
        c.shutdown();

        assert_eq!(c.recorder().phase(), RecordingPhase::Idle);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
