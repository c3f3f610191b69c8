//! Songs and the `latest.json` feed format.
//!
//! ## Wire format
//!
//!   { "songs": [ { "artist": string|null, "title": string, "timestamp": number }, ... ] }
//!
//! `timestamp` is Unix seconds and the array is newest-first. Decoding runs in
//! two stages so each can be exercised on its own:
//!
//!   1. `parse_feed`   — JSON text → `RawFeed` (numeric timestamps)
//!   2. `convert_feed` — `RawFeed` → `Vec<Song>` (`DateTime<Utc>` timestamps)

use std::borrow::Borrow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Public types ──────────────────────────────────────────────────────────────

/// One played song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub artist: Option<String>,
    pub title: String,
    /// When the song started playing.
    pub timestamp: DateTime<Utc>,
}

impl Song {
    pub fn new(artist: Option<&str>, title: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            artist: artist.map(str::to_string),
            title: title.to_string(),
            timestamp,
        }
    }

    /// "Artist – Title", or just "Title" when the artist is unknown.
    pub fn display(&self) -> String {
        match self.artist.as_deref().filter(|a| !a.is_empty()) {
            Some(a) => format!("{} \u{2013} {}", a, self.title),
            None => self.title.clone(),
        }
    }
}

/// Feed item as it appears on the wire, before timestamp conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSong {
    #[serde(default)]
    pub artist: Option<String>,
    pub title: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeed {
    pub songs: Vec<RawSong>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("song {index} has an unrepresentable timestamp: {value}")]
    Timestamp { index: usize, value: f64 },
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Stage 1: parse the response body.
pub fn parse_feed(body: &str) -> Result<RawFeed, FeedError> {
    Ok(serde_json::from_str(body)?)
}

/// Stage 2: convert every raw Unix-seconds timestamp to a point in time.
/// Precision is milliseconds, matching what a browser `Date` would hold.
pub fn convert_feed(raw: RawFeed) -> Result<Vec<Song>, FeedError> {
    raw.songs
        .into_iter()
        .enumerate()
        .map(|(index, s)| {
            let timestamp = unix_seconds_to_utc(s.timestamp)
                .ok_or(FeedError::Timestamp { index, value: s.timestamp })?;
            Ok(Song {
                artist: s.artist,
                title: s.title,
                timestamp,
            })
        })
        .collect()
}

/// Both stages.
pub fn decode_feed(body: &str) -> Result<Vec<Song>, FeedError> {
    convert_feed(parse_feed(body)?)
}

pub fn unix_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
}

// ── Encoding ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireSong<'a> {
    timestamp: i64,
    artist: Option<&'a str>,
    title: &'a str,
}

#[derive(Serialize)]
struct WireFeed<'a> {
    songs: Vec<WireSong<'a>>,
}

/// Render songs as a `latest.json` document with integer-second timestamps.
pub fn encode_feed(songs: &[Song]) -> Result<String, FeedError> {
    let feed = WireFeed {
        songs: songs
            .iter()
            .map(|s| WireSong {
                timestamp: s.timestamp.timestamp(),
                artist: s.artist.as_deref(),
                title: &s.title,
            })
            .collect(),
    };
    Ok(serde_json::to_string(&feed)?)
}

// ── New-song scan ─────────────────────────────────────────────────────────────

/// Strictly newer than the mark. With no mark every song is new.
pub fn is_newer(song: &Song, mark: Option<DateTime<Utc>>) -> bool {
    match mark {
        Some(m) => song.timestamp > m,
        None => true,
    }
}

/// Leading run of songs newer than `mark`. Stops at the first song that is
/// not, so nothing past that point is pulled from `songs`.
pub fn take_new<I>(songs: I, mark: Option<DateTime<Utc>>) -> impl Iterator<Item = I::Item>
where
    I: IntoIterator,
    I::Item: Borrow<Song>,
{
    songs
        .into_iter()
        .take_while(move |s| is_newer(s.borrow(), mark))
}

/// Prefix of a newest-first `feed` that is newer than `mark`.
pub fn new_songs_since(feed: &[Song], mark: Option<DateTime<Utc>>) -> &[Song] {
    let n = take_new(feed, mark).count();
    &feed[..n]
}

// ── Song text parsing ─────────────────────────────────────────────────────────

/// Split "Artist - Title" on the first separator. Text without one is all title.
pub fn parse_song_text(text: &str) -> (Option<String>, String) {
    let s = text.trim();
    match s.split_once(" - ") {
        Some((artist, title)) => {
            let artist = artist.trim();
            (
                Some(artist.to_string()).filter(|a| !a.is_empty()),
                title.trim().to_string(),
            )
        }
        None => (None, s.to_string()),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    fn song_at(secs: i64) -> Song {
        Song::new(Some("Artist"), &format!("Song {}", secs), ts(secs))
    }

    #[test]
    fn test_decode_feed() {
        let body = r#"{"songs":[
            {"artist":"Boards of Canada","title":"Roygbiv","timestamp":1400000100},
            {"artist":null,"title":"Station ID","timestamp":1400000000}
        ]}"#;
        let songs = decode_feed(body).unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].artist.as_deref(), Some("Boards of Canada"));
        assert_eq!(songs[0].timestamp, ts(1_400_000_100));
        assert!(songs[1].artist.is_none());
        assert_eq!(songs[1].title, "Station ID");
    }

    #[test]
    fn test_missing_artist_field_is_none() {
        let raw = parse_feed(r#"{"songs":[{"title":"T","timestamp":1}]}"#).unwrap();
        assert!(raw.songs[0].artist.is_none());
    }

    #[test]
    fn test_fractional_timestamp_keeps_millis() {
        let songs = decode_feed(r#"{"songs":[{"artist":"A","title":"T","timestamp":10.25}]}"#).unwrap();
        assert_eq!(songs[0].timestamp.timestamp_millis(), 10_250);
    }

    #[test]
    fn test_missing_songs_field_fails() {
        assert!(matches!(decode_feed(r#"{"tracks":[]}"#), Err(FeedError::Json(_))));
    }

    #[test]
    fn test_non_numeric_timestamp_fails() {
        let body = r#"{"songs":[{"artist":"A","title":"T","timestamp":"yesterday"}]}"#;
        assert!(matches!(decode_feed(body), Err(FeedError::Json(_))));
    }

    #[test]
    fn test_out_of_range_timestamp_fails() {
        let raw = RawFeed {
            songs: vec![
                RawSong { artist: None, title: "ok".into(), timestamp: 1.0 },
                RawSong { artist: None, title: "bad".into(), timestamp: 1e300 },
            ],
        };
        match convert_feed(raw) {
            Err(FeedError::Timestamp { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected timestamp error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_uses_integer_seconds() {
        let songs = vec![Song::new(None, "Title", ts(1_400_000_000))];
        let json = encode_feed(&songs).unwrap();
        assert_eq!(
            json,
            r#"{"songs":[{"timestamp":1400000000,"artist":null,"title":"Title"}]}"#
        );
        assert_eq!(decode_feed(&json).unwrap(), songs);
    }

    #[test]
    fn test_new_songs_stop_at_mark() {
        let feed = vec![song_at(50), song_at(40), song_at(30), song_at(20)];
        let new = new_songs_since(&feed, Some(ts(30)));
        let stamps: Vec<i64> = new.iter().map(|s| s.timestamp.timestamp()).collect();
        assert_eq!(stamps, vec![50, 40]);
    }

    #[test]
    fn test_scan_never_inspects_past_first_old_song() {
        let feed = vec![song_at(50), song_at(40), song_at(30), song_at(20)];
        let mut pulled = Vec::new();
        let new: Vec<&Song> = take_new(
            feed.iter().inspect(|s| pulled.push(s.timestamp.timestamp())),
            Some(ts(30)),
        )
        .collect();
        assert_eq!(new.len(), 2);
        assert_eq!(pulled, vec![50, 40, 30]);
    }

    #[test]
    fn test_equal_timestamp_is_not_new() {
        let feed = vec![song_at(30), song_at(20)];
        assert!(new_songs_since(&feed, Some(ts(30))).is_empty());
    }

    #[test]
    fn test_absent_mark_treats_everything_as_new() {
        let feed = vec![song_at(30), song_at(20)];
        assert_eq!(new_songs_since(&feed, None).len(), 2);
    }

    #[test]
    fn test_unsorted_tail_is_ignored() {
        // A newer song after an old one is not picked up; the feed is trusted to be sorted.
        let feed = vec![song_at(50), song_at(10), song_at(60)];
        assert_eq!(new_songs_since(&feed, Some(ts(20))).len(), 1);
    }

    #[test]
    fn test_parse_song_text() {
        let (artist, title) = parse_song_text("Aphex Twin - Xtal - Remastered");
        assert_eq!(artist.as_deref(), Some("Aphex Twin"));
        assert_eq!(title, "Xtal - Remastered");

        let (artist, title) = parse_song_text("  Station Identification ");
        assert!(artist.is_none());
        assert_eq!(title, "Station Identification");
    }

    #[test]
    fn test_display() {
        assert_eq!(song_at(1).display(), "Artist \u{2013} Song 1");
        assert_eq!(Song::new(None, "Only", ts(1)).display(), "Only");
    }
}
