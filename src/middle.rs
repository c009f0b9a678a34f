// Every screen decision lives here, as one pure function of (state, event).
// Nothing in this module touches audio or the terminal.

use crate::effect_kind::CustomSettings;
use crate::session::Selection;
use crate::shared::{
    Event, PauseStopIcon, Screen, UiCommand, RECORDING, RECORDING_PAUSED, SAVING, TAP_TO_RECORD,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordUi {
    Idle,
    Recording,
    Paused,
    Saving, // stop requested, waiting for the file
}

#[derive(Clone, Debug, PartialEq)]
pub struct UiState {
    pub screen: Screen,
    pub record: RecordUi,
    pub allow_pause: bool,
    pub clip: Option<String>, // title of the loaded clip
    pub playing: Option<Selection>,
    pub custom: CustomSettings,
}

impl UiState {
    pub fn new(allow_pause: bool) -> Self {
        Self {
            screen: Screen::Record,
            record: RecordUi::Idle,
            allow_pause,
            clip: None,
            playing: None,
            custom: CustomSettings::default(),
        }
    }
}

pub fn transition(state: &UiState, event: Event) -> (UiState, Vec<UiCommand>) {
    let mut next = state.clone();
    let mut cmds = Vec::new();

    match event {
        Event::Quit => {
            if matches!(state.record, RecordUi::Recording | RecordUi::Paused) {
                cmds.push(UiCommand::StopRecording);
            }
            if state.clip.is_some() {
                cmds.push(UiCommand::UnloadClip);
                next.clip = None;
                next.playing = None;
            }
            cmds.push(UiCommand::Quit);
        }

        // ── record screen ──
        Event::MicPressed if state.screen == Screen::Record => {
            let audio = match state.record {
                RecordUi::Idle => UiCommand::StartRecording,
                RecordUi::Paused => UiCommand::ResumeRecording,
                RecordUi::Recording | RecordUi::Saving => return (next, cmds),
            };
            next.record = RecordUi::Recording;
            let icon = if state.allow_pause { PauseStopIcon::Pause } else { PauseStopIcon::Stop };
            cmds.extend([
                UiCommand::SetLabel(RECORDING),
                UiCommand::SetBlinking(true),
                UiCommand::EnableRecord(false),
                UiCommand::ShowPauseStop(Some(icon)),
                audio,
            ]);
        }
        Event::PauseStopPressed if state.screen == Screen::Record => match state.record {
            RecordUi::Recording if state.allow_pause => {
                next.record = RecordUi::Paused;
                cmds.extend([
                    UiCommand::SetLabel(RECORDING_PAUSED),
                    UiCommand::SetBlinking(false),
                    UiCommand::EnableRecord(true),
                    UiCommand::ShowPauseStop(Some(PauseStopIcon::Stop)),
                    UiCommand::PauseRecording,
                ]);
            }
            RecordUi::Recording | RecordUi::Paused => {
                next.record = RecordUi::Saving;
                cmds.extend([
                    UiCommand::SetLabel(SAVING),
                    UiCommand::SetBlinking(false),
                    UiCommand::EnableRecord(false),
                    UiCommand::ShowPauseStop(None),
                    UiCommand::StopRecording,
                ]);
            }
            RecordUi::Idle | RecordUi::Saving => {}
        },
        Event::RecordingFinished(title) => {
            next.record = RecordUi::Idle;
            next.screen = Screen::Play;
            next.clip = Some(title.clone());
            next.playing = None;
            cmds.extend(reset_record_display());
            cmds.extend([
                UiCommand::LoadFinishedClip,
                UiCommand::ShowClip(Some(title)),
                UiCommand::ShowSelection(None),
                UiCommand::ShowStatus(String::new()),
                UiCommand::ShowScreen(Screen::Play),
            ]);
        }
        Event::RecordingFailed(msg) => {
            // also covers a finished take that could not be loaded
            next.record = RecordUi::Idle;
            next.screen = Screen::Record;
            next.clip = None;
            next.playing = None;
            cmds.extend(reset_record_display());
            cmds.extend([
                UiCommand::ShowClip(None),
                UiCommand::ShowSelection(None),
                UiCommand::ShowScreen(Screen::Record),
                UiCommand::ShowStatus(msg),
            ]);
        }
        Event::RecordingStarted | Event::RecordingResumed => {
            cmds.push(UiCommand::ShowStatus(String::new()));
        }
        Event::RecordingPaused => {}

        // ── play and custom screens ──
        Event::EffectPressed(kind) if state.screen == Screen::Play => {
            cmds.push(UiCommand::Play(Selection::Effect(kind)));
        }
        Event::PassThroughPressed if state.screen == Screen::Play => {
            cmds.push(UiCommand::Play(Selection::PassThrough));
        }
        Event::CustomPressed if state.screen == Screen::Play => {
            next.screen = Screen::Custom;
            cmds.extend([UiCommand::ShowCustom(state.custom), UiCommand::ShowScreen(Screen::Custom)]);
        }
        Event::StopPressed if state.screen != Screen::Record => {
            next.playing = None;
            cmds.extend([UiCommand::StopPlayback, UiCommand::ShowSelection(None)]);
        }
        Event::Back if state.screen == Screen::Play => {
            next.screen = Screen::Record;
            next.clip = None;
            next.playing = None;
            cmds.extend([
                UiCommand::StopPlayback,
                UiCommand::UnloadClip,
                UiCommand::ShowSelection(None),
                UiCommand::ShowClip(None),
                UiCommand::ShowStatus(String::new()),
                UiCommand::ShowScreen(Screen::Record),
            ]);
        }
        Event::Back if state.screen == Screen::Custom => {
            next.screen = Screen::Play;
            cmds.push(UiCommand::ShowScreen(Screen::Play));
        }
        Event::CustomKnob(knob, clicks) if state.screen == Screen::Custom => {
            next.custom = state.custom.turned(knob, clicks);
            cmds.push(UiCommand::ShowCustom(next.custom));
        }
        Event::PlayCustomPressed if state.screen == Screen::Custom => {
            cmds.push(UiCommand::Play(Selection::Custom(state.custom)));
        }

        Event::PlaybackStarted(selection) => {
            next.playing = Some(selection);
            cmds.extend([UiCommand::ShowSelection(Some(selection)), UiCommand::ShowStatus(String::new())]);
        }
        Event::PlaybackFailed(msg) => {
            next.playing = None;
            cmds.extend([UiCommand::ShowSelection(None), UiCommand::ShowStatus(msg)]);
        }
        Event::PlaybackEnded => {
            next.playing = None;
            cmds.push(UiCommand::ShowSelection(None));
        }

        // keys that mean nothing on the current screen
        _ => {}
    }

    (next, cmds)
}

// back to "Tap to record"
fn reset_record_display() -> [UiCommand; 4] {
    [
        UiCommand::SetLabel(TAP_TO_RECORD),
        UiCommand::SetBlinking(false),
        UiCommand::EnableRecord(true),
        UiCommand::ShowPauseStop(None),
    ]
}
