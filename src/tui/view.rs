use crate::effect_kind::CustomKnob;
use crate::session::Selection;
use crate::shared::{DisplayState, PauseStopIcon, Screen};
use super::grid;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Gauge, Paragraph};
use ratatui::Frame;

const KNOBS: [(CustomKnob, &str); 4] = [
    (CustomKnob::Rate, "[ ]"),
    (CustomKnob::Pitch, "- ="),
    (CustomKnob::Drive, ", ."),
    (CustomKnob::Mix, "; '"),
];

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title / clip
            Constraint::Min(8),    // screen body
            Constraint::Length(1), // key hints
            Constraint::Length(1), // status line
        ])
        .split(area);

    draw_header(frame, sections[0], state);
    match state.screen {
        Screen::Record => draw_record(frame, sections[1], state, blink_on),
        Screen::Play => draw_play(frame, sections[1], state),
        Screen::Custom => draw_custom(frame, sections[1], state),
    }
    draw_hints(frame, sections[2], state.screen);
    draw_status(frame, sections[3], state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let title = match &state.clip_title {
        Some(title) => format!("PITCH PERFECT  ·  {title}"),
        None => "PITCH PERFECT".to_string(),
    };
    let header = Paragraph::new(title)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::bordered());
    frame.render_widget(header, area);
}

fn draw_record(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(5)])
        .split(area);

    // the label disappears on the off beat while blinking
    let label_style = if state.blinking && !blink_on {
        Style::default().fg(Color::Black)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    };
    let label = Paragraph::new(state.label).alignment(Alignment::Center).style(label_style);
    frame.render_widget(label, rows[0]);

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let mic_style = if state.record_enabled {
        Style::default().fg(Color::LightRed)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mic = Paragraph::new("● MIC\n(r)")
        .alignment(Alignment::Center)
        .style(mic_style)
        .block(Block::bordered().border_style(mic_style));
    frame.render_widget(mic, buttons[0]);

    // hidden until a recording is live
    if let Some(icon) = state.pause_stop {
        let text = match icon {
            PauseStopIcon::Pause => "❚❚ PAUSE\n(space)",
            PauseStopIcon::Stop => "■ STOP\n(space)",
        };
        let style = Style::default().fg(Color::LightCyan);
        let button = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::bordered().border_style(style));
        frame.render_widget(button, buttons[1]);
    }
}

fn draw_play(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(3)])
        .split(area);

    let lit = match state.playing {
        Some(Selection::Effect(kind)) => Some(kind),
        _ => None,
    };
    grid::draw_effect_grid(frame, rows[0], lit);

    let now = match state.playing {
        Some(selection) => format!("▶ {}", selection.label()),
        None => "■ stopped".to_string(),
    };
    let original_style = if state.playing == Some(Selection::PassThrough) {
        Style::default().fg(Color::LightMagenta)
    } else {
        Style::default().fg(Color::Gray)
    };
    let footer = Line::from(vec![
        Span::styled("0 ORIGINAL", original_style),
        Span::raw("    "),
        Span::raw(now),
    ]);
    frame.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center).block(Block::bordered()),
        rows[1],
    );
}

fn draw_custom(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3); 4])
        .split(area);

    let playing_custom = matches!(state.playing, Some(Selection::Custom(_)));
    for ((knob, keys), row) in KNOBS.iter().zip(rows.iter()) {
        let value = state.custom.value(*knob);
        let (min, max) = knob_range(*knob);
        let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0) as f64;
        let color = if playing_custom { Color::LightMagenta } else { Color::Cyan };
        let gauge = Gauge::default()
            .block(Block::bordered().title(format!("{} ({keys})", knob.label())))
            .gauge_style(Style::default().fg(color))
            .ratio(ratio)
            .label(format_knob(*knob, value));
        frame.render_widget(gauge, *row);
    }
}

fn draw_hints(frame: &mut Frame, area: Rect, screen: Screen) {
    let hints = match screen {
        Screen::Record => "r record/resume · space pause/stop · esc quit",
        Screen::Play => "1-6 effect · 0 original · space stop · c custom · esc discard",
        Screen::Custom => "p play · space stop · esc back",
    };
    let line = Paragraph::new(hints)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(line, area);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState) {
    if state.status.is_empty() {
        return;
    }
    let status = Paragraph::new(state.status.as_str()).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, area);
}

fn knob_range(knob: CustomKnob) -> (f32, f32) {
    use crate::effect_kind::{MIX_RANGE, PITCH_RANGE, RATE_RANGE};
    match knob {
        CustomKnob::Rate => RATE_RANGE,
        CustomKnob::Pitch => PITCH_RANGE,
        CustomKnob::Drive => (0.0, 1.0),
        CustomKnob::Mix => MIX_RANGE,
    }
}

fn format_knob(knob: CustomKnob, value: f32) -> String {
    match knob {
        CustomKnob::Rate => format!("{value:.2}x"),
        CustomKnob::Pitch => format!("{value:+.0}¢"),
        CustomKnob::Drive => format!("{:.0}%", value * 100.0),
        CustomKnob::Mix => format!("{value:.0}% wet"),
    }
}
