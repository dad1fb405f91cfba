//! Note types: the synchronized document entity and its local draft form.

use crate::{Error, NoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Confirmation state of a note relative to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Changed locally, not yet acknowledged by the remote store
    #[default]
    Pending,
    /// Matches the last version acknowledged by the remote store
    Synced,
    /// Delivery failed too many times; needs an explicit retry
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "error" => Ok(SyncStatus::Error),
            other => Err(Error::InvalidNote(format!("unknown sync status '{other}'"))),
        }
    }
}

/// A note as stored locally and exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Client-generated identifier, stable across online/offline boundaries
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Free-form labels; order carries no meaning
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the note was first created (milliseconds since epoch)
    pub created_at: Timestamp,
    /// When the note was last changed; strictly increases per note
    pub updated_at: Timestamp,
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Set only after the remote store acknowledged this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<Timestamp>,
}

impl Note {
    /// Create a fresh, not yet synced note.
    pub fn new(
        id: impl Into<NoteId>,
        title: impl Into<String>,
        content: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
            sync_status: SyncStatus::Pending,
            last_synced: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Check if the note carries an unconfirmed local edit.
    pub fn is_pending(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }

    /// Check if the note still has to reach the remote store.
    pub fn needs_sync(&self) -> bool {
        matches!(self.sync_status, SyncStatus::Pending | SyncStatus::Error)
    }

    /// Record a remote acknowledgment.
    pub fn mark_synced(&mut self, timestamp: Timestamp) {
        self.sync_status = SyncStatus::Synced;
        self.last_synced = Some(timestamp);
    }

    /// Copy of a remote note as it is materialized locally.
    pub fn from_remote(remote: &Note, timestamp: Timestamp) -> Self {
        let mut note = remote.clone();
        note.mark_synced(timestamp);
        note
    }

    /// Reject notes that cannot be stored or addressed.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidNote("note id must not be empty".into()));
        }
        Ok(())
    }
}

/// Caller-supplied content for a local create or save.
///
/// The store fills in the id (when absent), timestamps and sync status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NoteId>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Explicit status; `None` means the write is a local edit (pending)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<NoteId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = Some(status);
        self
    }
}

/// Editing an existing note starts from its current content.
impl From<Note> for NoteDraft {
    fn from(note: Note) -> Self {
        Self {
            id: Some(note.id),
            title: note.title,
            content: note.content,
            tags: note.tags,
            sync_status: None,
        }
    }
}
