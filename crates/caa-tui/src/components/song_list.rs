//! SongList — the latest-songs panel.
//!
//! Newest at top. Each row shows:
//!   ●  HH:MM  Artist            Title
//! where the dot marks songs from the most recent batch.
//!
//! Keybindings:
//!   j/k ↑↓      — navigate
//!   PgUp/PgDn   — page
//!   g/G         — first / last
//!   y           — copy "Artist – Title" to clipboard

use chrono::{DateTime, Local, Utc};
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::controller::SongListState;
use crate::theme::{
    style_border, style_selected, style_title, C_FRESH, C_MUTED, C_PRIMARY, C_SECONDARY,
};

const ARTIST_COL_MAX: usize = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListAction {
    CopyToClipboard(String),
}

#[derive(Default)]
pub struct SongList {
    pub selected: usize,
    pub scroll_offset: usize,
    /// Rows visible in the last draw, for paging.
    page: usize,
}

impl SongList {
    pub fn new() -> Self {
        Self::default()
    }

    fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    fn select_down(&mut self, n: usize, max: usize) {
        self.selected = (self.selected + n).min(max.saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: KeyEvent, state: &SongListState) -> Option<ListAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let total = state.songs.len();
        let page = self.page.max(1);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.select_down(1, total),
            KeyCode::PageUp => self.select_up(page),
            KeyCode::PageDown => self.select_down(page, total),
            KeyCode::Home | KeyCode::Char('g') => {
                self.selected = 0;
                self.scroll_offset = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = total.saturating_sub(1);
            }
            KeyCode::Char('y') => {
                return state
                    .songs
                    .get(self.selected)
                    .map(|s| ListAction::CopyToClipboard(s.display()));
            }
            _ => {}
        }
        None
    }

    /// Keep the selection on the same song when `added` rows appear above it.
    pub fn shift_for_prepend(&mut self, added: usize) {
        if self.selected > 0 {
            self.selected += added;
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, state: &SongListState) {
        if area.height == 0 {
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border())
            .title(Span::styled(" latest songs ", style_title()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let total = state.songs.len();
        let height = inner.height as usize;
        self.page = height;

        if total == 0 {
            frame.render_widget(
                Paragraph::new(Span::styled("  waiting for songs…", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }

        if self.selected >= total {
            self.selected = total - 1;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected.saturating_sub(height.saturating_sub(1));
        }

        let rows = state.songs.iter().enumerate().skip(self.scroll_offset).take(height);
        let artist_width = state
            .songs
            .iter()
            .skip(self.scroll_offset)
            .take(height)
            .map(|s| s.artist.as_deref().map(UnicodeWidthStr::width).unwrap_or(0))
            .max()
            .unwrap_or(0)
            .min(ARTIST_COL_MAX);

        let lines: Vec<Line> = rows
            .map(|(i, song)| {
                let fresh = i < state.fresh;
                let text_style = if i == self.selected {
                    style_selected()
                } else if fresh || i == 0 {
                    Style::default().fg(C_PRIMARY)
                } else {
                    Style::default().fg(C_SECONDARY)
                };

                let mut spans = vec![
                    Span::styled(
                        if fresh { " \u{25cf} " } else { "   " },
                        Style::default().fg(C_FRESH),
                    ),
                    Span::styled(
                        format!("{}  ", format_ts(&song.timestamp)),
                        Style::default().fg(C_MUTED),
                    ),
                ];
                if artist_width > 0 {
                    spans.push(Span::styled(
                        format!("{}  ", fit_width(song.artist.as_deref().unwrap_or(""), artist_width)),
                        text_style,
                    ));
                }
                spans.push(Span::styled(song.title.clone(), text_style));
                Line::from(spans)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn format_ts(ts: &DateTime<Utc>) -> String {
    let local = ts.with_timezone(&Local);
    let today = Local::now().date_naive();
    if local.date_naive() == today {
        local.format("%H:%M").to_string()
    } else {
        local.format("%m/%d %H:%M").to_string()
    }
}

/// Pad or truncate `s` to exactly `width` terminal columns.
fn fit_width(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w <= width {
        return format!("{}{}", s, " ".repeat(width - w));
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let cw = c.width().unwrap_or(0);
        if used + cw + 1 > width {
            break;
        }
        out.push(c);
        used += cw;
    }
    out.push('\u{2026}');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
