//! Status bar: bottom line with backend health, input mode and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_ACCENT, C_FILTER_FG, C_MUTED, C_PLAYING, C_SECONDARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    List,
    Filter,
    Notice,
}

/// Result of the startup `/healthz` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Unknown,
    Up,
    Down,
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, health: Health) {
    let dot = match health {
        Health::Unknown => Span::styled("○", Style::default().fg(C_MUTED)),
        Health::Up => Span::styled("●", Style::default().fg(C_PLAYING)),
        Health::Down => Span::styled("●", Style::default().fg(C_ACCENT)),
    };
    let (label, color) = match mode {
        InputMode::List => ("LIST", C_SECONDARY),
        InputMode::Filter => ("FILTER", C_FILTER_FG),
        InputMode::Notice => ("NOTICE", C_ACCENT),
    };
    let keys = match mode {
        InputMode::List => {
            " ↑↓/jk select  Enter stream  Space pause  s stop  d download  / filter  r search  L latest  q quit"
        }
        InputMode::Filter => " type to edit  Tab switch field  Enter search  Esc back to list",
        InputMode::Notice => " Enter/Esc close",
    };

    let line = Line::from(vec![
        Span::raw(" "),
        dot,
        Span::styled(
            format!(" {} ", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
