//! App: the event loop that ties the filter form, the message list, the
//! shared player and the download controller together.
//!
//! Architecture:
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks (keyboard, fetches, download tasks, file saves, mpv events).
//! - The event loop draws when something changed, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Fetches run as spawned tasks; results are applied in arrival order.

use std::io;
use std::time::Duration;

use mailcast_proto::config::Config;
use mailcast_proto::{ApiError, MailApi, MessageSummary};
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    action::Action,
    components::message_list::MessageList,
    download::{DownloadController, DownloadEvent, DownloadOutcome},
    player::{MpvEvent, MpvPlayer},
    save::{FileSaver, SaveReport},
    session::{PlaybackController, PlaybackState},
    theme::{style_muted, C_ACCENT, C_PAUSED, C_PLAYING, C_PRIMARY},
    widgets::{
        filter_form::{FilterForm, FormAction},
        notice::{Notice, NoticeQueue},
        status_bar::{draw_keys_bar, Health, InputMode},
        toast::ToastManager,
    },
    workflow::{self, FetchOrigin},
};

/// Everything that can wake the event loop.
pub enum AppMessage {
    Event(Event),
    Fetched {
        origin: FetchOrigin,
        result: Result<Vec<MessageSummary>, ApiError>,
    },
    Download(DownloadEvent),
    Saved(SaveReport),
    Player(MpvEvent),
    Health(Result<(), ApiError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Filter,
    List,
}

/// Receivers created with the controllers, forwarded into the main channel
/// once the loop starts.
struct Inbox {
    downloads: mpsc::UnboundedReceiver<DownloadEvent>,
    saves: mpsc::UnboundedReceiver<SaveReport>,
    player: mpsc::Receiver<MpvEvent>,
}

pub struct App {
    api: MailApi,
    max_results: usize,
    search_on_startup: bool,

    filter: FilterForm,
    list: MessageList,
    playback: PlaybackController<MpvPlayer>,
    downloads: DownloadController<FileSaver>,

    toast: ToastManager,
    notices: NoticeQueue,
    focus: Focus,
    health: Health,
    pending_fetches: usize,
    should_quit: bool,

    tx: Option<mpsc::Sender<AppMessage>>,
    inbox: Option<Inbox>,
}

impl App {
    pub fn new(config: &Config, api: MailApi) -> Self {
        let (download_tx, download_rx) = mpsc::unbounded_channel();
        let (save_tx, save_rx) = mpsc::unbounded_channel();
        let (player_tx, player_rx) = mpsc::channel(64);

        let saver = FileSaver::new(
            api.clone(),
            config.paths.downloads_dir.clone(),
            save_tx,
        );
        info!("[app] downloads go to {}", saver.dir().display());

        Self {
            max_results: config.search.max_results,
            search_on_startup: config.search.search_on_startup,
            filter: FilterForm::new(&config.search.initial_from, &config.search.initial_title),
            list: MessageList::new(),
            playback: PlaybackController::new(MpvPlayer::new(config.mpv.default_volume, player_tx)),
            downloads: DownloadController::new(api.clone(), saver, download_tx),
            api,
            toast: ToastManager::new(),
            notices: NoticeQueue::default(),
            focus: Focus::List,
            health: Health::Unknown,
            pending_fetches: 0,
            should_quit: false,
            tx: None,
            inbox: Some(Inbox {
                downloads: download_rx,
                saves: save_rx,
                player: player_rx,
            }),
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.tx = Some(tx.clone());

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            if event_tx.is_closed() {
                break;
            }
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        });

        // ── Background tasks: controller channels → AppMessage ────────────────
        if let Some(inbox) = self.inbox.take() {
            spawn_forwarder(inbox.downloads, tx.clone(), AppMessage::Download);
            spawn_forwarder(inbox.saves, tx.clone(), AppMessage::Saved);
            let player_tx = tx.clone();
            let mut player_rx = inbox.player;
            tokio::spawn(async move {
                while let Some(ev) = player_rx.recv().await {
                    if player_tx.send(AppMessage::Player(ev)).await.is_err() {
                        break;
                    }
                }
            });
        }

        // ── Startup: health probe and initial search ──────────────────────────
        let health_api = self.api.clone();
        let health_tx = tx.clone();
        tokio::spawn(async move {
            let result = health_api.health().await;
            let _ = health_tx.send(AppMessage::Health(result)).await;
        });

        if self.search_on_startup {
            self.dispatch(Action::Refresh).await;
        }

        // Toast expiry check + spinner animation
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg).await;
                }
                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        drop(rx);
        self.playback.player_mut().shutdown().await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("[app] exiting");
        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    /// Returns true when the screen needs a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Resize(_, _) => {}
                _ => return false,
            },

            AppMessage::Fetched { origin, result } => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                if self.pending_fetches == 0 {
                    self.toast.dismiss_spinner();
                }
                match workflow::present(result, &mut self.list, &mut self.playback).await {
                    Ok(0) => self.toast.info("no messages"),
                    Ok(n) => self.toast.info(format!("{} messages", n)),
                    Err(e) => {
                        let what = match origin {
                            FetchOrigin::Search(_) => "search",
                            FetchOrigin::Latest => "latest",
                        };
                        self.toast.error(format!("{} failed: {}", what, e));
                    }
                }
            }

            AppMessage::Download(event) => {
                let id = event.message_id.clone();
                match self.downloads.apply(event) {
                    DownloadOutcome::Saved { file_name, .. } => {
                        self.toast.info(format!("saving {}", file_name));
                    }
                    DownloadOutcome::Failed(reason) => {
                        warn!("[app] download for {} failed: {}", id, reason);
                        self.notices.push(Notice::new("Download failed", reason));
                    }
                }
            }

            AppMessage::Saved(report) => match report.result {
                Ok(path) => self.toast.success(format!("saved {}", path.display())),
                Err(e) => self.toast.error(format!("{}: {}", report.file_name, e)),
            },

            AppMessage::Player(ev) => {
                if let Some(paused) = ev.pause_change() {
                    self.playback.paused_changed(paused);
                    return true;
                }
                if ev.end_reason().is_some() && !self.playback.player().is_current(&ev) {
                    debug!("[app] ignoring end of a replaced file: {}", ev.raw);
                    return false;
                }
                match ev.end_reason() {
                    Some("eof") => self.playback.finished(),
                    Some("error") => {
                        let reason = ev.file_error().unwrap_or("unknown error").to_string();
                        warn!("[app] stream ended with error: {}", reason);
                        self.playback.finished();
                        self.toast.error(format!("stream failed: {}", reason));
                    }
                    _ => return false,
                }
            }

            AppMessage::Health(result) => match result {
                Ok(()) => {
                    info!("[app] backend {} is healthy", self.api.base_url());
                    self.health = Health::Up;
                }
                Err(e) => {
                    warn!("[app] health check failed: {}", e);
                    self.health = Health::Down;
                    self.toast.warning(format!("backend unreachable: {}", e));
                }
            },
        }
        true
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return vec![Action::Quit];
        }

        // Notices block all other input until dismissed.
        if self.notices.is_blocking() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.notices.dismiss();
            }
            return vec![];
        }

        if self.focus == Focus::Filter {
            return match self.filter.handle_key(key) {
                FormAction::Submit(filter) => vec![Action::FocusList, Action::Search(filter)],
                FormAction::Cancelled => vec![Action::FocusList],
                FormAction::None => vec![],
            };
        }

        match key.code {
            KeyCode::Char('q') => vec![Action::Quit],
            KeyCode::Char('/') | KeyCode::Char('f') | KeyCode::Tab => vec![Action::FocusFilter],
            KeyCode::Char('r') => vec![Action::Refresh],
            KeyCode::Char('L') => vec![Action::FetchLatest],
            KeyCode::Char(' ') => vec![Action::TogglePause],
            KeyCode::Char('s') => vec![Action::Stop],
            _ => self.list.handle_key(key),
        }
    }

    async fn dispatch(&mut self, action: Action) {
        debug!("[app] dispatch {:?}", action);
        match action {
            Action::Search(filter) => self.spawn_fetch(FetchOrigin::Search(filter)),
            Action::Refresh => self.spawn_fetch(FetchOrigin::Search(self.filter.filter())),
            Action::FetchLatest => self.spawn_fetch(FetchOrigin::Latest),

            Action::Stream(id) => {
                if let Err(e) = self.playback.stream(&self.api, &id).await {
                    error!("[app] streaming {} failed: {:#}", id, e);
                    self.toast.error(format!("playback failed: {:#}", e));
                }
            }
            Action::TogglePause => {
                if let Err(e) = self.playback.toggle_pause().await {
                    warn!("[app] toggle pause failed: {:#}", e);
                }
            }
            Action::Stop => self.playback.teardown().await,

            Action::Download(id) => {
                if !self.downloads.trigger(&id) {
                    self.toast.info("already downloading");
                }
            }

            Action::FocusFilter => {
                self.focus = Focus::Filter;
                self.filter.activate();
            }
            Action::FocusList => {
                self.focus = Focus::List;
                self.filter.deactivate();
            }

            Action::Quit => self.should_quit = true,
        }
    }

    fn spawn_fetch(&mut self, origin: FetchOrigin) {
        let Some(tx) = self.tx.clone() else {
            warn!("[app] fetch requested before the event loop started");
            return;
        };
        self.pending_fetches += 1;
        self.toast.spinner(origin.label());

        let api = self.api.clone();
        let max = self.max_results;
        tokio::spawn(async move {
            let result = workflow::fetch(&api, &origin, max).await;
            let _ = tx.send(AppMessage::Fetched { origin, result }).await;
        });
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        self.draw_header(frame, rows[0]);
        self.filter.draw(frame, rows[1]);

        let downloads = &self.downloads;
        self.list.draw(
            frame,
            rows[2],
            self.focus == Focus::List,
            self.playback.session(),
            |id| downloads.control(id),
        );

        let mode = if self.notices.is_blocking() {
            InputMode::Notice
        } else if self.focus == Focus::Filter {
            InputMode::Filter
        } else {
            InputMode::List
        };
        draw_keys_bar(frame, rows[3], mode, self.health);

        self.toast.draw(frame, area);
        self.notices.draw(frame, area);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " mailcast ",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        )];

        let session = self.playback.session();
        if let Some(id) = session.active_message_id.as_deref() {
            let (icon, color) = match session.state {
                PlaybackState::Paused => ("⏸", C_PAUSED),
                _ => ("▶", C_PLAYING),
            };
            let title = self
                .list
                .find(id)
                .map(|e| e.summary.subject.as_str())
                .unwrap_or(id);
            spans.push(Span::styled(format!(" {} ", icon), Style::default().fg(color)));
            spans.push(Span::styled(title.to_string(), Style::default().fg(C_PRIMARY)));
        }

        let in_flight = self.downloads.in_flight();
        if in_flight > 0 {
            spans.push(Span::styled(
                format!("   ⬇ {} generating", in_flight),
                style_muted(),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn spawn_forwarder<T: Send + 'static>(
    mut rx: mpsc::UnboundedReceiver<T>,
    tx: mpsc::Sender<AppMessage>,
    wrap: fn(T) -> AppMessage,
) {
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            if tx.send(wrap(item)).await.is_err() {
                break;
            }
        }
    });
}
