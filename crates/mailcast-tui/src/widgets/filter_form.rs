//! FilterForm: the sender and title fields above the message list.

use mailcast_proto::Filter;
use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED, C_SECONDARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    From,
    Title,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FormAction {
    Submit(Filter),
    Cancelled,
    None,
}

pub struct FilterForm {
    from: Input,
    title: Input,
    field: FilterField,
    pub active: bool,
}

impl FilterForm {
    pub fn new(from: &str, title: &str) -> Self {
        Self {
            from: Input::new(from.to_string()),
            title: Input::new(title.to_string()),
            field: FilterField::Title,
            active: false,
        }
    }

    /// Current field values, untrimmed.
    pub fn filter(&self) -> Filter {
        Filter::new(self.from.value(), self.title.value())
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub fn field(&self) -> FilterField {
        self.field
    }

    fn current(&mut self) -> &mut Input {
        match self.field {
            FilterField::From => &mut self.from,
            FilterField::Title => &mut self.title,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.field = match self.field {
                    FilterField::From => FilterField::Title,
                    FilterField::Title => FilterField::From,
                };
                FormAction::None
            }
            KeyCode::Enter => {
                self.deactivate();
                FormAction::Submit(self.filter())
            }
            KeyCode::Esc => {
                self.deactivate();
                FormAction::Cancelled
            }
            _ => {
                self.current().handle_event(&Event::Key(key));
                FormAction::None
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);
        self.draw_field(frame, halves[0], "from", &self.from, FilterField::From);
        self.draw_field(frame, halves[1], "title", &self.title, FilterField::Title);
    }

    fn draw_field(&self, frame: &mut Frame, area: Rect, label: &str, input: &Input, field: FilterField) {
        let focused = self.active && self.field == field;
        let prefix = format!(" {}: ", label);
        let prefix_width = prefix.chars().count() as u16;
        let width = area.width.saturating_sub(prefix_width + 1) as usize;
        let scroll = input.visual_scroll(width);

        let label_style = if focused {
            Style::default().fg(C_FILTER_FG).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_SECONDARY)
        };
        let value = if input.value().is_empty() {
            Span::styled("(any)", Style::default().fg(C_MUTED))
        } else {
            let visible: String = input.value().chars().skip(scroll).collect();
            Span::styled(visible, Style::default().fg(C_FILTER_FG))
        };

        frame.render_widget(
            Paragraph::new(Line::from(vec![Span::styled(prefix, label_style), value]))
                .style(Style::default().bg(C_FILTER_BG)),
            area,
        );

        if focused && area.width > 0 {
            let cursor_x = area.x + prefix_width + (input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}
