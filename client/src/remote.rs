//! The remote note store: the authoritative copy the client syncs against.

use crate::config::{ClientConfig, ConfigError};
use crate::error::{unreachable, Error, Result};
use async_trait::async_trait;
use noteline_engine::Note;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Remote side of the sync.
///
/// Every failure to reach the store or get a successful answer is reported
/// as [`Error::Unreachable`]. `delete` of an unknown id reports
/// [`Error::NotFound`].
#[async_trait]
pub trait RemoteNoteStore: Send + Sync {
    /// Full list of notes held remotely.
    async fn fetch_all(&self) -> Result<Vec<Note>>;

    /// Create or replace one note. Returns the stored copy.
    async fn save(&self, note: &Note) -> Result<Note>;

    /// Remove one note.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// REST client for a note collection at `base_url`.
///
/// `GET base` lists, `PUT base/{id}` upserts, `DELETE base/{id}` removes.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration) -> std::result::Result<Self, ConfigError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|_| ConfigError::InvalidRemoteUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidRemoteUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        Self::new(&config.remote_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base/{id}` with the id percent-encoded as one path segment.
    fn note_url(&self, id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| unreachable(format!("cannot address note {id} under {}", self.base_url)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Unreachable(format!("{what} returned HTTP {status}: {body}")))
}

#[async_trait]
impl RemoteNoteStore for HttpRemote {
    async fn fetch_all(&self) -> Result<Vec<Note>> {
        let resp = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(unreachable)?;

        let notes: Vec<Note> = check(resp, "list notes")
            .await?
            .json()
            .await
            .map_err(unreachable)?;

        debug!(count = notes.len(), "Fetched remote notes");
        Ok(notes)
    }

    async fn save(&self, note: &Note) -> Result<Note> {
        let resp = self
            .client
            .put(self.note_url(&note.id)?)
            .json(note)
            .send()
            .await
            .map_err(unreachable)?;

        check(resp, "save note")
            .await?
            .json()
            .await
            .map_err(unreachable)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.note_url(id)?)
            .send()
            .await
            .map_err(unreachable)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id.to_string()));
        }
        check(resp, "delete note").await?;
        Ok(())
    }
}
