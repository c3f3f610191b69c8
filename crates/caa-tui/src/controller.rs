//! Incremental list controller.
//!
//! Fetches the feed once to seed the display, then every `period` refetches
//! and prepends whatever is newer than the high-water mark. The newest song
//! of each batch is handed to the notifier.
//!
//! Each tick runs its refresh in its own task, so a slow fetch can overlap the
//! next one. Merges take the state lock, but completions are applied in the
//! order they finish, not the order they started.

use std::sync::Arc;
use std::time::Duration;

use caa_proto::songs::{new_songs_since, Song};
use chrono::{DateTime, Local, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::feed::{FeedSource, FetchError};
use crate::notify::Notifier;

/// What the view renders.
#[derive(Debug, Clone, Default)]
pub struct SongListState {
    /// Newest first.
    pub songs: Vec<Song>,
    /// Timestamp of the newest song already in `songs`.
    pub high_water: Option<DateTime<Utc>>,
    /// Bumped on every change to `songs`.
    pub rev: u64,
    /// How many leading songs arrived in the latest batch.
    pub fresh: usize,
    pub last_success: Option<DateTime<Local>>,
    pub last_error: Option<String>,
    pub failures: u64,
}

impl SongListState {
    /// Replace the display with a full feed and take its newest timestamp as the mark.
    pub fn initialize(&mut self, feed: Vec<Song>) {
        self.high_water = feed.first().map(|s| s.timestamp);
        self.songs = feed;
        self.fresh = 0;
        self.rev += 1;
    }

    /// Prepend the songs newer than the mark and advance it.
    /// `max_songs` of 0 keeps everything. Returns the batch, newest first.
    ///
    /// An empty batch still ends the previous batch's highlight.
    pub fn merge<'a>(&mut self, feed: &'a [Song], max_songs: usize) -> &'a [Song] {
        let batch = new_songs_since(feed, self.high_water);
        if batch.is_empty() {
            if self.fresh != 0 {
                self.fresh = 0;
                self.rev += 1;
            }
            return batch;
        }

        self.high_water = Some(batch[0].timestamp);
        self.songs.splice(0..0, batch.iter().cloned());
        if max_songs > 0 {
            self.songs.truncate(max_songs);
        }
        self.fresh = batch.len().min(self.songs.len());
        self.rev += 1;
        batch
    }

    fn record_success(&mut self) {
        self.last_success = Some(Local::now());
        self.last_error = None;
    }

    fn record_failure(&mut self, error: &FetchError) {
        self.last_error = Some(error.to_string());
        self.failures += 1;
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The first fetch seeded the display. Newest first.
    Initialized { songs: Vec<Song> },
    /// One merged batch, newest first.
    SongsAdded { songs: Vec<Song> },
    FetchFailed { message: String },
}

#[derive(Clone)]
pub struct Controller {
    state: Arc<RwLock<SongListState>>,
    source: Arc<dyn FeedSource>,
    notifier: Arc<Notifier>,
    events: broadcast::Sender<ControllerEvent>,
    period: Duration,
    max_songs: usize,
}

impl Controller {
    pub fn new(source: Arc<dyn FeedSource>, notifier: Arc<Notifier>, period: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Arc::new(RwLock::new(SongListState::default())),
            source,
            notifier,
            events,
            period,
            max_songs: 0,
        }
    }

    pub fn with_max_songs(mut self, max_songs: usize) -> Self {
        self.max_songs = max_songs;
        self
    }

    pub fn state(&self) -> Arc<RwLock<SongListState>> {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// One fetch that seeds the display. Not retried on failure.
    pub async fn initialize(&self) {
        match self.source.fetch_latest().await {
            Ok(feed) => {
                info!("[controller] initial feed: {} songs", feed.len());
                {
                    let mut state = self.state.write().await;
                    state.initialize(feed.clone());
                    state.record_success();
                }
                let _ = self.events.send(ControllerEvent::Initialized { songs: feed });
            }
            Err(e) => self.fetch_failed("initial fetch", e).await,
        }
    }

    /// One refresh cycle. Returns how many songs were added.
    pub async fn refresh(&self) -> usize {
        let feed = match self.source.fetch_latest().await {
            Ok(feed) => feed,
            Err(e) => {
                self.fetch_failed("refresh", e).await;
                return 0;
            }
        };

        let batch = {
            let mut state = self.state.write().await;
            let batch = state.merge(&feed, self.max_songs).to_vec();
            state.record_success();
            batch
        };

        let Some(newest) = batch.first() else {
            debug!("[controller] nothing new");
            return 0;
        };

        let count = batch.len();
        info!("[controller] {} new song(s), newest: {}", count, newest.display());
        self.notifier.notify(newest.artist.as_deref(), &newest.title);
        let _ = self.events.send(ControllerEvent::SongsAdded { songs: batch });
        count
    }

    async fn fetch_failed(&self, what: &str, error: FetchError) {
        warn!("[controller] {} failed: {}", what, error);
        self.state.write().await.record_failure(&error);
        let _ = self.events.send(ControllerEvent::FetchFailed {
            message: error.to_string(),
        });
    }

    /// Start the initial fetch and the refresh timer. The first refresh fires
    /// one full period after this call.
    pub fn spawn(self) -> ControllerHandle {
        let token = CancellationToken::new();
        let state = self.state();
        let events = self.events.clone();
        let loop_token = token.clone();

        let join = tokio::spawn(async move {
            let init = self.clone();
            let init_token = loop_token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = init_token.cancelled() => {}
                    _ = init.initialize() => {}
                }
            });

            let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let cycle = self.clone();
                        let cycle_token = loop_token.clone();
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = cycle_token.cancelled() => {}
                                _ = cycle.refresh() => {}
                            }
                        });
                    }
                }
            }
            debug!("[controller] refresh timer stopped");
        });

        ControllerHandle {
            token,
            join: Some(join),
            state,
            events,
        }
    }
}

/// Owns the running refresh timer. Dropping the handle stops it.
pub struct ControllerHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
    state: Arc<RwLock<SongListState>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ControllerHandle {
    pub fn state(&self) -> Arc<RwLock<SongListState>> {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Stop the timer; in-flight fetches are dropped without touching state.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
