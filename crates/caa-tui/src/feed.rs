//! Data source adapter: one GET against `latest.json`.

use std::time::Duration;

use async_trait::async_trait;
use caa_proto::songs::{decode_feed, FeedError, Song};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("feed returned status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Decode(#[from] FeedError),
}

/// Anything that can hand back the current newest-first song list.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Song>, FetchError>;
}

pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    /// `timeout` of `None` lets a request wait as long as the server does.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch_latest(&self) -> Result<Vec<Song>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.text().await?;
        let songs = decode_feed(&body)?;
        debug!("[feed] {} songs from {}", songs.len(), self.url);
        Ok(songs)
    }
}
