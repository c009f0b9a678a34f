use std::time::Duration;
use crossterm::event::{self, KeyCode, KeyEventKind};
use crate::effect_kind::{CustomKnob, EffectKind};
use crate::shared::{Event, Screen};
use super::mode::TuiState;

// poll for input from tui, resolves the key against the current screen
// into events for the middle layer
pub fn poll_input(timeout: Duration, ts: &TuiState) -> anyhow::Result<Vec<Event>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let event::Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &TuiState) -> Vec<Event> {
    match ts.screen {
        Screen::Record => resolve_record(code),
        Screen::Play => resolve_play(code),
        Screen::Custom => resolve_custom(code),
    }
}

fn resolve_record(code: KeyCode) -> Vec<Event> {
    match code {
        KeyCode::Esc => vec![Event::Quit],
        KeyCode::Char('r') => vec![Event::MicPressed],
        KeyCode::Char(' ') => vec![Event::PauseStopPressed],
        _ => vec![],
    }
}

fn resolve_play(code: KeyCode) -> Vec<Event> {
    match code {
        KeyCode::Esc => vec![Event::Back],
        KeyCode::Char(' ') => vec![Event::StopPressed],
        KeyCode::Char('0') => vec![Event::PassThroughPressed],
        KeyCode::Char('c') => vec![Event::CustomPressed],
        // effect buttons, 1-6
        KeyCode::Char(c @ '1'..='9') => {
            let n = c as u8 - b'0';
            EffectKind::from_key(n).map(Event::EffectPressed).into_iter().collect()
        }
        _ => vec![],
    }
}

// knobs turn one click per press, lower key = down
fn resolve_custom(code: KeyCode) -> Vec<Event> {
    let knob = |knob, clicks| vec![Event::CustomKnob(knob, clicks)];
    match code {
        KeyCode::Esc => vec![Event::Back],
        KeyCode::Char(' ') => vec![Event::StopPressed],
        KeyCode::Char('p') => vec![Event::PlayCustomPressed],
        KeyCode::Char('[') => knob(CustomKnob::Rate, -1.0),
        KeyCode::Char(']') => knob(CustomKnob::Rate, 1.0),
        KeyCode::Char('-') => knob(CustomKnob::Pitch, -1.0),
        KeyCode::Char('=') => knob(CustomKnob::Pitch, 1.0),
        KeyCode::Char(',') => knob(CustomKnob::Drive, -1.0),
        KeyCode::Char('.') => knob(CustomKnob::Drive, 1.0),
        KeyCode::Char(';') => knob(CustomKnob::Mix, -1.0),
        KeyCode::Char('\'') => knob(CustomKnob::Mix, 1.0),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(screen: Screen) -> TuiState {
        TuiState { screen }
    }

    #[test]
    fn space_depends_on_screen() {
        let space = KeyCode::Char(' ');
        assert_eq!(handle_key(space, &on(Screen::Record)), vec![Event::PauseStopPressed]);
        assert_eq!(handle_key(space, &on(Screen::Play)), vec![Event::StopPressed]);
        assert_eq!(handle_key(space, &on(Screen::Custom)), vec![Event::StopPressed]);
    }

    #[test]
    fn number_keys_pick_effects() {
        let play = on(Screen::Play);
        assert_eq!(handle_key(KeyCode::Char('1'), &play), vec![Event::EffectPressed(EffectKind::Slow)]);
        assert_eq!(handle_key(KeyCode::Char('4'), &play), vec![Event::EffectPressed(EffectKind::DarthVader)]);
        assert_eq!(handle_key(KeyCode::Char('6'), &play), vec![Event::EffectPressed(EffectKind::Delay)]);
        assert!(handle_key(KeyCode::Char('7'), &play).is_empty());
        assert!(handle_key(KeyCode::Char('1'), &on(Screen::Record)).is_empty());
    }

    #[test]
    fn custom_knob_keys() {
        let custom = on(Screen::Custom);
        assert_eq!(
            handle_key(KeyCode::Char('='), &custom),
            vec![Event::CustomKnob(CustomKnob::Pitch, 1.0)]
        );
        assert_eq!(
            handle_key(KeyCode::Char(';'), &custom),
            vec![Event::CustomKnob(CustomKnob::Mix, -1.0)]
        );
    }

    #[test]
    fn esc_quits_only_from_record() {
        assert_eq!(handle_key(KeyCode::Esc, &on(Screen::Record)), vec![Event::Quit]);
        assert_eq!(handle_key(KeyCode::Esc, &on(Screen::Play)), vec![Event::Back]);
    }
}
