//! When to scrape next.
//!
//! Songs run a few minutes, so right after a change there is nothing to see
//! for a while; an idle station (nothing new for 10 minutes) is checked rarely.

use std::time::Duration;

use caa_proto::songs::Song;
use chrono::{DateTime, Utc};

pub const FAILURE_DELAY: Duration = Duration::from_secs(60);
pub const NORMAL_DELAY: Duration = Duration::from_secs(30);
pub const IDLE_DELAY: Duration = Duration::from_secs(10 * 60);

fn idle_after() -> chrono::Duration {
    chrono::Duration::minutes(10)
}

fn settle_after() -> chrono::Duration {
    chrono::Duration::minutes(2)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    /// Fetch or parse failed, or the page listed nothing.
    Failed,
    Unchanged(Song),
    Changed(Song),
}

pub fn next_delay(now: DateTime<Utc>, outcome: &ScrapeOutcome) -> Duration {
    match outcome {
        ScrapeOutcome::Failed => FAILURE_DELAY,
        ScrapeOutcome::Unchanged(latest) => {
            if now > latest.timestamp + idle_after() {
                IDLE_DELAY
            } else {
                NORMAL_DELAY
            }
        }
        ScrapeOutcome::Changed(latest) => {
            let settled = latest.timestamp + settle_after();
            if now < settled {
                (settled - now).to_std().unwrap_or(NORMAL_DELAY)
            } else {
                NORMAL_DELAY
            }
        }
    }
}

/// Remembers the newest song of the previous scrape.
#[derive(Debug, Default)]
pub struct LatestTracker {
    previous: Option<Song>,
}

impl LatestTracker {
    /// `None` means the scrape failed.
    pub fn observe(&mut self, songs: Option<&[Song]>) -> ScrapeOutcome {
        let Some(latest) = songs.and_then(|s| s.first()) else {
            return ScrapeOutcome::Failed;
        };
        if self.previous.as_ref() == Some(latest) {
            ScrapeOutcome::Unchanged(latest.clone())
        } else {
            self.previous = Some(latest.clone());
            ScrapeOutcome::Changed(latest.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Song {
        Song::new(Some("A"), "T", DateTime::<Utc>::from_timestamp(secs, 0).unwrap())
    }

    fn now(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_failure_waits_a_minute() {
        assert_eq!(next_delay(now(0), &ScrapeOutcome::Failed), FAILURE_DELAY);
    }

    #[test]
    fn test_unchanged_recent_polls_normally() {
        let outcome = ScrapeOutcome::Unchanged(at(1000));
        assert_eq!(next_delay(now(1000 + 300), &outcome), NORMAL_DELAY);
    }

    #[test]
    fn test_unchanged_idle_backs_off() {
        let outcome = ScrapeOutcome::Unchanged(at(1000));
        assert_eq!(next_delay(now(1000 + 601), &outcome), IDLE_DELAY);
        assert_eq!(next_delay(now(1000 + 600), &outcome), NORMAL_DELAY);
    }

    #[test]
    fn test_changed_fresh_song_waits_until_settled() {
        let outcome = ScrapeOutcome::Changed(at(1000));
        assert_eq!(next_delay(now(1000 + 45), &outcome), Duration::from_secs(75));
    }

    #[test]
    fn test_changed_old_song_polls_normally() {
        let outcome = ScrapeOutcome::Changed(at(1000));
        assert_eq!(next_delay(now(1000 + 120), &outcome), NORMAL_DELAY);
        assert_eq!(next_delay(now(1000 + 500), &outcome), NORMAL_DELAY);
    }

    #[test]
    fn test_tracker() {
        let mut tracker = LatestTracker::default();
        assert_eq!(tracker.observe(None), ScrapeOutcome::Failed);
        assert_eq!(tracker.observe(Some(&[])), ScrapeOutcome::Failed);
        assert_eq!(tracker.observe(Some(&[at(10)])), ScrapeOutcome::Changed(at(10)));
        assert_eq!(tracker.observe(Some(&[at(10), at(5)])), ScrapeOutcome::Unchanged(at(10)));
        // A failure in between does not forget the previous song.
        assert_eq!(tracker.observe(None), ScrapeOutcome::Failed);
        assert_eq!(tracker.observe(Some(&[at(10)])), ScrapeOutcome::Unchanged(at(10)));
        assert_eq!(tracker.observe(Some(&[at(20), at(10)])), ScrapeOutcome::Changed(at(20)));
    }
}
