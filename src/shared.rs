// The input plan, resolved per screen by tui::input:
//
// Record screen:
//   r             //  MicPressed (start, or resume when paused)
//   Space         //  PauseStopPressed
//   Esc           //  Quit
//
// Play screen:
//   1 2 3 4 5 6   //  EffectPressed(Slow, Fast, Chipmunk, DarthVader, Reverb, Delay)
//   0             //  PassThroughPressed
//   Space         //  StopPressed
//   c             //  CustomPressed
//   Esc           //  Back (stops, unloads and discards the clip)
//
// Custom screen:
//   [ / ]         //  CustomKnob(Rate, -1 or 1)
//   - / =         //  CustomKnob(Pitch, -1 or 1)
//   , / .         //  CustomKnob(Drive, -1 or 1)
//   ; / '         //  CustomKnob(Mix, -1 or 1)
//   p             //  PlayCustomPressed
//   Space         //  StopPressed
//   Esc           //  Back to the play screen
//
// The rendering process:
//   - middle::transition decides everything. It returns UiCommands; audio ones go
//     to the controller, display ones are applied to a DisplayState here.
//   - The controller answers with feedback Events (recording finished, playback
//     ended, failures), which go back through middle::transition.
//   - The TUI just draws the DisplayState each frame: the label (blinking while
//     recording), the record and pause/stop buttons, the effect grid, the knobs and
//     a status line.

use crate::effect_kind::{CustomKnob, CustomSettings, EffectKind};
use crate::session::Selection;

pub const TAP_TO_RECORD: &str = "Tap to record";
pub const RECORDING: &str = "recording";
pub const RECORDING_PAUSED: &str = "recording paused";
pub const SAVING: &str = "saving";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Record,
    Play,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseStopIcon {
    Pause,
    Stop,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    // keys
    MicPressed,
    PauseStopPressed,
    EffectPressed(EffectKind),
    PassThroughPressed,
    StopPressed,
    CustomPressed,
    CustomKnob(CustomKnob, f32), // knob, clicks
    PlayCustomPressed,
    Back,
    Quit,

    // feedback from the controller
    RecordingStarted,
    RecordingPaused,
    RecordingResumed,
    RecordingFailed(String),
    RecordingFinished(String), // clip title
    PlaybackStarted(Selection),
    PlaybackFailed(String),
    PlaybackEnded,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UiCommand {
    // audio, carried out by the controller
    StartRecording,
    PauseRecording,
    ResumeRecording,
    StopRecording,
    LoadFinishedClip,
    Play(Selection),
    StopPlayback,
    UnloadClip,

    // display, applied to the DisplayState
    SetLabel(&'static str),
    SetBlinking(bool),
    EnableRecord(bool),
    ShowPauseStop(Option<PauseStopIcon>), // None hides the button
    ShowScreen(Screen),
    ShowStatus(String),
    ShowClip(Option<String>),
    ShowSelection(Option<Selection>),
    ShowCustom(CustomSettings),

    Quit,
}

impl UiCommand {
    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            UiCommand::StartRecording
                | UiCommand::PauseRecording
                | UiCommand::ResumeRecording
                | UiCommand::StopRecording
                | UiCommand::LoadFinishedClip
                | UiCommand::Play(_)
                | UiCommand::StopPlayback
                | UiCommand::UnloadClip
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub screen: Screen,
    pub label: &'static str,
    pub blinking: bool,
    pub record_enabled: bool,
    pub pause_stop: Option<PauseStopIcon>,
    pub status: String, // last failure or hint, empty when there is nothing to say
    pub clip_title: Option<String>,
    pub playing: Option<Selection>, // lights the matching effect button
    pub custom: CustomSettings,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            screen: Screen::Record,
            label: TAP_TO_RECORD,
            blinking: false,
            record_enabled: true,
            pause_stop: None,
            status: String::new(),
            clip_title: None,
            playing: None,
            custom: CustomSettings::default(),
        }
    }
}

impl DisplayState {
    // Interpret one display command. Returns false for commands that are not
    // about the display, which are left for the controller.
    pub fn apply(&mut self, cmd: &UiCommand) -> bool {
        match cmd {
            UiCommand::SetLabel(label) => self.label = *label,
            UiCommand::SetBlinking(on) => self.blinking = *on,
            UiCommand::EnableRecord(on) => self.record_enabled = *on,
            UiCommand::ShowPauseStop(icon) => self.pause_stop = *icon,
            UiCommand::ShowScreen(screen) => self.screen = *screen,
            UiCommand::ShowStatus(text) => self.status = text.clone(),
            UiCommand::ShowClip(title) => self.clip_title = title.clone(),
            UiCommand::ShowSelection(selection) => self.playing = *selection,
            UiCommand::ShowCustom(custom) => self.custom = *custom,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_commands_update_state() {
        let mut ds = DisplayState::default();
        assert!(ds.apply(&UiCommand::SetLabel(RECORDING)));
        assert!(ds.apply(&UiCommand::SetBlinking(true)));
        assert!(ds.apply(&UiCommand::ShowPauseStop(Some(PauseStopIcon::Pause))));
        assert_eq!(ds.label, RECORDING);
        assert!(ds.blinking);
        assert_eq!(ds.pause_stop, Some(PauseStopIcon::Pause));
    }

    #[test]
    fn audio_commands_are_left_alone() {
        let mut ds = DisplayState::default();
        let before = ds.clone();
        for cmd in [UiCommand::StartRecording, UiCommand::UnloadClip, UiCommand::Quit] {
            assert!(!ds.apply(&cmd));
        }
        assert_eq!(ds, before);
        assert!(UiCommand::Play(Selection::PassThrough).is_audio());
        assert!(!UiCommand::Quit.is_audio());
    }
}
