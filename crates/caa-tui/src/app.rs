//! App — terminal event loop around the list controller.
//!
//! - A blocking reader thread forwards terminal events into an mpsc channel.
//! - A forwarder task turns controller broadcasts into `AppMessage`s.
//! - The loop redraws only when something changed, then awaits the next message.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::components::song_list::{ListAction, SongList};
use crate::controller::{ControllerEvent, ControllerHandle, SongListState};
use crate::theme::{C_ACCENT, C_ERROR, C_MUTED, C_SECONDARY, C_TOAST};

const FLASH_FOR: Duration = Duration::from_secs(2);

enum AppMessage {
    Event(Event),
    Controller(ControllerEvent),
}

pub struct App {
    state: Arc<RwLock<SongListState>>,
    song_list: SongList,
    feed_url: String,
    /// Short-lived status message (clipboard result).
    flash: Option<(String, Instant)>,
    should_quit: bool,
}

impl App {
    pub fn new(state: Arc<RwLock<SongListState>>, feed_url: String) -> Self {
        Self {
            state,
            song_list: SongList::new(),
            feed_url,
            flash: None,
            should_quit: false,
        }
    }

    pub async fn run(
        mut self,
        handle: ControllerHandle,
        mut events: broadcast::Receiver<ControllerEvent>,
    ) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            if event_tx.is_closed() {
                break;
            }
            match event::poll(Duration::from_millis(250)) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(_) => break,
            }
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: controller broadcasts ────────────────────────────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ev) => {
                        if bc_tx.send(AppMessage::Controller(ev)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("controller receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        drop(tx);

        // Clock tick: keeps relative timestamps and the flash message current.
        let mut clock = tokio::time::interval(Duration::from_secs(1));
        clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("caa-radio TUI started, feed {}", self.feed_url);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                let shared = Arc::clone(&self.state);
                let state = shared.read().await;
                terminal.draw(|f| self.draw(f, &state))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => needs_redraw = self.handle_message(msg).await,
                    None => break,
                },
                _ = clock.tick() => {
                    if self.flash.as_ref().is_some_and(|(_, at)| at.elapsed() >= FLASH_FOR) {
                        self.flash = None;
                    }
                    needs_redraw = true;
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        rx.close();
        handle.shutdown().await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        debug!("caa-radio TUI stopped");
        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
                if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    self.should_quit = true;
                    return true;
                }
                let action = {
                    let state = self.state.read().await;
                    self.song_list.handle_key(key, &state)
                };
                if let Some(ListAction::CopyToClipboard(text)) = action {
                    self.copy_to_clipboard(text);
                }
                true
            }
            AppMessage::Event(Event::Resize(_, _)) => true,
            AppMessage::Event(_) => false,
            AppMessage::Controller(ControllerEvent::SongsAdded { songs }) => {
                self.song_list.shift_for_prepend(songs.len());
                true
            }
            AppMessage::Controller(_) => true,
        }
    }

    fn copy_to_clipboard(&mut self, text: String) {
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
            Ok(()) => self.flash = Some((format!("copied: {}", text), Instant::now())),
            Err(e) => {
                warn!("clipboard error: {}", e);
                self.flash = Some((format!("clipboard error: {}", e), Instant::now()));
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame, state: &SongListState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(frame.area());

        self.song_list.draw(frame, chunks[0], state);
        self.draw_status(frame, chunks[1], state);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect, state: &SongListState) {
        let mut spans = vec![Span::styled(
            format!(" {} songs", state.songs.len()),
            Style::default().fg(C_SECONDARY),
        )];
        if let Some(at) = state.last_success {
            spans.push(Span::styled(
                format!(" · updated {}", at.format("%H:%M:%S")),
                Style::default().fg(C_MUTED),
            ));
        }
        if let Some(err) = &state.last_error {
            spans.push(Span::styled(
                format!(" · {} ({} failed)", err, state.failures),
                Style::default().fg(C_ERROR),
            ));
        }
        if let Some((msg, _)) = &self.flash {
            spans.push(Span::styled(format!(" · {}", msg), Style::default().fg(C_TOAST)));
        }
        spans.push(Span::styled(format!(" · {}", self.feed_url), Style::default().fg(C_MUTED)));
        spans.push(Span::styled("  q quit · y copy", Style::default().fg(C_ACCENT)));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
