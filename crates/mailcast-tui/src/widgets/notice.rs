//! Blocking notices: a modal box that swallows input until dismissed.

use std::collections::VecDeque;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::{style_muted, C_ACCENT, C_PRIMARY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Default)]
pub struct NoticeQueue {
    queue: VecDeque<Notice>,
}

impl NoticeQueue {
    pub fn push(&mut self, notice: Notice) {
        self.queue.push_back(notice);
    }

    /// Close the front notice. Returns false if nothing was open.
    pub fn dismiss(&mut self) -> bool {
        self.queue.pop_front().is_some()
    }

    pub fn is_blocking(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn current(&self) -> Option<&Notice> {
        self.queue.front()
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let Some(notice) = self.current() else {
            return;
        };
        let popup = centered_rect(60, 7, area);
        frame.render_widget(Clear, popup);

        let mut title = format!(" {} ", notice.title);
        if self.queue.len() > 1 {
            title = format!(" {} (1/{}) ", notice.title, self.queue.len());
        }
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(C_ACCENT));

        let text = vec![
            Line::from(Span::styled(notice.body.as_str(), Style::default().fg(C_PRIMARY))),
            Line::from(""),
            Line::from(Span::styled("Enter / Esc to close", style_muted())),
        ];
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            popup,
        );
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}
