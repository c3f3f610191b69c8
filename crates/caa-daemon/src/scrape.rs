//! Scraper for the station's "last played" HTML page.
//!
//! The page is one table, newest row first:
//!
//!   <tr><td>March 5, 2014 10:15:32PM PST</td><td>Artist - Title</td></tr>
//!
//! Times carry a zone abbreviation; output timestamps are UTC.

use caa_proto::songs::{parse_song_text, Song};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::warn;

pub use caa_proto::config::ENTRY_BUFFER_SIZE;

const DATE_FORMAT: &str = "%B %d, %Y %I:%M:%S%p";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: reqwest::StatusCode },
    #[error("bad selector {0}")]
    Selector(String),
    #[error("page has no song table")]
    NoTable,
}

pub async fn fetch_last_played(client: &reqwest::Client, url: &str) -> Result<String, ScrapeError> {
    let response = client
        .get(url)
        .header("Accept", "text/html")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ScrapeError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    Ok(response.text().await?)
}

/// Parse up to `limit` songs, newest first. Rows that don't parse are skipped.
pub fn parse_last_played(html: &str, limit: usize) -> Result<Vec<Song>, ScrapeError> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse("table").map_err(|e| ScrapeError::Selector(e.to_string()))?;
    let table = doc.select(&table_sel).next().ok_or(ScrapeError::NoTable)?;
    let tbody = child_elements(table, "tbody").next().ok_or(ScrapeError::NoTable)?;

    let mut songs = Vec::new();
    for (row_idx, row) in child_elements(tbody, "tr").enumerate() {
        if songs.len() >= limit {
            break;
        }
        let cells: Vec<String> = child_elements(row, "td").map(cell_text).collect();
        if cells.len() < 2 {
            warn!("[scrape] row {} has {} cells, skipping", row_idx, cells.len());
            continue;
        }
        let Some(timestamp) = parse_played_at(&cells[0]) else {
            warn!("[scrape] row {}: unparsable date {:?}", row_idx, cells[0]);
            continue;
        };
        let (artist, title) = parse_song_text(&cells[1]);
        songs.push(Song {
            artist,
            title,
            timestamp,
        });
    }
    Ok(songs)
}

/// "March 5, 2014 10:15:32PM PST" → UTC.
pub fn parse_played_at(text: &str) -> Option<DateTime<Utc>> {
    let (local, zone) = text.trim().rsplit_once(' ')?;
    let naive = NaiveDateTime::parse_from_str(local.trim(), DATE_FORMAT).ok()?;
    let offset_secs = zone_offset_secs(zone).unwrap_or_else(|| {
        warn!("[scrape] unknown time zone {:?}, assuming UTC", zone);
        0
    });
    FixedOffset::east_opt(offset_secs)?
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn zone_offset_secs(abbrev: &str) -> Option<i32> {
    let hours = match abbrev {
        "PST" => -8,
        "PDT" => -7,
        "UTC" | "GMT" => 0,
        _ => return None,
    };
    Some(hours * 3600)
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == name)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
