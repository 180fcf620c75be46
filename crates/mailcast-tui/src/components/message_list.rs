//! MessageList component: the result set, one multi-line entry per message.
//!
//! Every render replaces the whole list. Before the old entries go away the
//! shared player is detached, so audio from a stale entry never keeps playing
//! under a new result set.

use mailcast_proto::MessageSummary;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tracing::debug;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    action::Action,
    download::DownloadControl,
    session::{MediaPlayer, PlaybackController, PlaybackSession, PlaybackState},
    theme::{style_muted, style_secondary, C_LINK, C_MUTED, C_PAUSED, C_PLAYING, C_PRIMARY, C_SELECTION_BG},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

/// Rows per entry: header, subject, preview, controls, spacer.
const ENTRY_ROWS: u16 = 5;

/// One rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub summary: MessageSummary,
    /// Formatted receive time.
    pub timestamp: String,
}

impl Entry {
    fn new(summary: MessageSummary) -> Self {
        let timestamp = summary.display_date();
        Self { summary, timestamp }
    }

    pub fn id(&self) -> &str {
        &self.summary.id
    }
}

pub struct MessageList {
    list: ScrollableList<Entry>,
}

impl MessageList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
        }
    }

    /// Replace the displayed entries with `messages`, in order.
    ///
    /// The player is detached and the playback session reset first, even when
    /// `messages` is empty.
    pub async fn render<P: MediaPlayer>(
        &mut self,
        messages: Vec<MessageSummary>,
        playback: &mut PlaybackController<P>,
    ) -> usize {
        playback.teardown().await;
        self.list.clear();
        let entries: Vec<Entry> = messages.into_iter().map(Entry::new).collect();
        debug!("[list] rendering {} entries", entries.len());
        self.list.set_items(entries);
        self.list.len()
    }

    pub fn entries(&self) -> &[Entry] {
        self.list.items()
    }

    pub fn selected(&self) -> Option<&Entry> {
        self.list.selected_item()
    }

    pub fn find(&self, id: &str) -> Option<&Entry> {
        self.entries().iter().find(|e| e.id() == id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            5
        } else {
            1
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter | KeyCode::Char('p') => {
                if let Some(entry) = self.selected() {
                    return vec![Action::Stream(entry.id().to_string())];
                }
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.selected() {
                    return vec![Action::Download(entry.id().to_string())];
                }
            }
            _ => {}
        }
        vec![]
    }

    pub fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        focused: bool,
        session: &PlaybackSession,
        control: impl Fn(&str) -> DownloadControl,
    ) {
        let count = format!("{} msgs", self.list.len());
        let block = pane_chrome(
            "messages",
            focused,
            Some(Badge {
                text: &count,
                color: C_MUTED,
            }),
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.list.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no messages", style_muted())),
                inner,
            );
            return;
        }

        let capacity = (inner.height / ENTRY_ROWS).max(1) as usize;
        self.list.ensure_visible(capacity);
        let selected = self.list.selected();
        let width = inner.width.saturating_sub(2) as usize;

        let mut lines: Vec<Line> = Vec::new();
        for (idx, entry) in self.list.visible_items(capacity) {
            let is_selected = idx == selected;
            let download = control(entry.id());
            let mut entry_lines = entry_lines(entry, session, download, width);
            if is_selected {
                let bg = if focused {
                    Style::default().bg(C_SELECTION_BG)
                } else {
                    Style::default()
                };
                for line in entry_lines.iter_mut() {
                    *line = std::mem::take(line).style(bg);
                }
            }
            lines.extend(entry_lines);
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Default for MessageList {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_lines(
    entry: &Entry,
    session: &PlaybackSession,
    download: DownloadControl,
    width: usize,
) -> Vec<Line<'static>> {
    let s = &entry.summary;
    let state = if session.is_active(entry.id()) {
        session.state
    } else {
        PlaybackState::Idle
    };
    let (marker, marker_color) = match state {
        PlaybackState::Playing => ("▶ ", C_PLAYING),
        PlaybackState::Paused => ("⏸ ", C_PAUSED),
        PlaybackState::Idle => ("  ", C_MUTED),
    };

    let header = Line::from(vec![
        Span::styled(marker, Style::default().fg(marker_color)),
        Span::styled(entry.timestamp.clone(), style_secondary()),
        Span::styled("  ·  ", style_muted()),
        Span::styled(truncate(&s.from, width.saturating_sub(24)), style_secondary()),
    ]);
    let subject = Line::from(vec![
        Span::raw("  "),
        Span::styled(
            truncate(&s.subject, width),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
    ]);
    let preview = Line::from(vec![
        Span::raw("  "),
        Span::styled(truncate(&s.preview, width), style_muted()),
    ]);

    let stream_label = match state {
        PlaybackState::Playing => "▶ streaming",
        PlaybackState::Paused => "⏸ paused",
        PlaybackState::Idle => "▷ stream",
    };
    let download_style = if download.enabled {
        Style::default().fg(C_LINK)
    } else {
        style_muted().add_modifier(Modifier::ITALIC)
    };
    let controls = Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("[{}]", stream_label), Style::default().fg(C_LINK)),
        Span::raw("  "),
        Span::styled(format!("[{}]", download.label), download_style),
    ]);

    vec![header, subject, preview, controls, Line::from("")]
}

/// Cut `text` to at most `width` terminal columns, adding an ellipsis.
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width.saturating_sub(1) {
            out.push('…');
            return out;
        }
        used += w;
        out.push(c);
    }
    out
}
