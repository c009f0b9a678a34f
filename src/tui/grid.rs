use crate::effect_kind::EffectKind;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

const COLS: usize = 3;
const ROWS: usize = 2;

// the six effect buttons, numbered like their keys; the playing one is lit
pub fn draw_effect_grid(frame: &mut Frame, area: Rect, lit: Option<EffectKind>) {
    let row_constraints = [Constraint::Ratio(1, ROWS as u32); ROWS];
    let col_constraints = [Constraint::Ratio(1, COLS as u32); COLS];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(area);

    for (row_idx, row_area) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let idx = row_idx * COLS + col_idx;
            let Some(&kind) = EffectKind::ALL.get(idx) else {
                continue;
            };
            let style = if lit == Some(kind) {
                Style::default().fg(Color::LightMagenta).bg(Color::Magenta).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let button = Paragraph::new(format!("{}\n{}", idx + 1, kind.label()))
                .alignment(Alignment::Center)
                .style(style)
                .block(Block::bordered().border_style(style));
            frame.render_widget(button, *cell_area);
        }
    }
}
