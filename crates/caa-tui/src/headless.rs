//! Line-oriented view for pipes and terminals without a TUI.
//!
//! Prints the initial list oldest-first, then each new batch oldest-first, so
//! the output reads chronologically.

use std::future::Future;
use std::io::Write;

use caa_proto::songs::Song;
use chrono::Local;
use tokio::sync::broadcast;
use tracing::warn;

use crate::controller::{ControllerEvent, ControllerHandle};

pub fn format_line(song: &Song) -> String {
    let local = song.timestamp.with_timezone(&Local);
    format!("{}  {}", local.format("%Y-%m-%d %H:%M"), song.display())
}

/// Print until `shutdown` resolves, then stop the controller.
pub async fn run<W, F>(
    handle: ControllerHandle,
    mut events: broadcast::Receiver<ControllerEvent>,
    shutdown: F,
    mut out: W,
) -> anyhow::Result<()>
where
    W: Write,
    F: Future,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            ev = events.recv() => match ev {
                Ok(ControllerEvent::Initialized { songs } | ControllerEvent::SongsAdded { songs }) => {
                    for song in songs.iter().rev() {
                        writeln!(out, "{}", format_line(song))?;
                    }
                }
                Ok(ControllerEvent::FetchFailed { message }) => {
                    eprintln!("fetch failed: {}", message);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("headless receiver lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
        out.flush()?;
    }

    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::feed::{FeedSource, FetchError};
    use crate::notify::Notifier;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct SteppedFeed {
        step: Mutex<usize>,
    }

    #[async_trait]
    impl FeedSource for SteppedFeed {
        async fn fetch_latest(&self) -> Result<Vec<Song>, FetchError> {
            let mut step = self.step.lock().unwrap();
            *step += 1;
            let newest = *step as i64;
            Ok((1..=newest)
                .rev()
                .map(|i| Song::new(Some("A"), &format!("T{}", i), DateTime::<Utc>::from_timestamp(i * 60, 0).unwrap()))
                .collect())
        }
    }

    fn titles(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| l.rsplit(' ').next().unwrap().to_string())
            .collect()
    }

    /// Serves each feed once, in order.
    struct QueuedFeed {
        feeds: Mutex<Vec<Vec<Song>>>,
    }

    #[async_trait]
    impl FeedSource for QueuedFeed {
        async fn fetch_latest(&self) -> Result<Vec<Song>, FetchError> {
            let mut feeds = self.feeds.lock().unwrap();
            if feeds.is_empty() {
                return Err(FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
            }
            Ok(feeds.remove(0))
        }
    }

    fn at(secs: i64) -> Song {
        Song::new(Some("A"), &format!("T{}", secs), DateTime::<Utc>::from_timestamp(secs, 0).unwrap())
    }

    #[tokio::test]
    async fn test_queued_batches_print_once_each() {
        let feed = Arc::new(QueuedFeed {
            feeds: Mutex::new(vec![
                vec![at(10)],
                vec![at(30), at(20), at(10)],
                vec![at(40), at(30)],
            ]),
        });
        let controller = Controller::new(feed, Arc::new(Notifier::disabled()), Duration::from_secs(3600));
        let events = controller.subscribe();

        // Both refreshes merge before the printer sees either event.
        controller.initialize().await;
        assert_eq!(controller.refresh().await, 2);
        assert_eq!(controller.refresh().await, 1);

        let handle = controller.spawn();
        let mut out = Vec::new();
        run(handle, events, tokio::time::sleep(Duration::from_millis(50)), &mut out)
            .await
            .unwrap();

        assert_eq!(titles(out), vec!["T10", "T20", "T30", "T40"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prints_chronologically() {
        let feed = Arc::new(SteppedFeed { step: Mutex::new(1) });
        let controller = Controller::new(feed, Arc::new(Notifier::disabled()), Duration::from_secs(30));
        let events = controller.subscribe();
        let handle = controller.spawn();

        let mut out = Vec::new();
        run(handle, events, tokio::time::sleep(Duration::from_secs(65)), &mut out)
            .await
            .unwrap();

        assert_eq!(titles(out), vec!["T1", "T2", "T3", "T4"]);
    }
}
