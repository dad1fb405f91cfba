//! Pending operations: durable records of local mutations awaiting remote
//! confirmation.
//!
//! An operation only names the note it targets. A `save` always delivers the
//! note's state at delivery time, so several queued saves of one note collapse
//! into a single request once the latest version is acknowledged.

use crate::{Error, NoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequence number assigned by the local store; defines replay order.
pub type OperationSeq = i64;

/// Entity type recorded on every operation.
pub const NOTE_ENTITY: &str = "note";

/// The mutation a pending operation replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Save,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Save => "save",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" => Ok(OperationKind::Save),
            "delete" => Ok(OperationKind::Delete),
            other => Err(Error::StorageUnavailable(format!(
                "unknown operation kind '{other}' in pending log"
            ))),
        }
    }
}

/// One outstanding local mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Assigned on enqueue; `None` until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OperationSeq>,
    pub operation: OperationKind,
    pub entity_type: String,
    /// Non-owning reference to the note
    pub entity_id: NoteId,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub retry_count: u32,
}

impl PendingOperation {
    fn new(operation: OperationKind, entity_id: impl Into<NoteId>, timestamp: Timestamp) -> Self {
        Self {
            id: None,
            operation,
            entity_type: NOTE_ENTITY.to_string(),
            entity_id: entity_id.into(),
            timestamp,
            retry_count: 0,
        }
    }

    /// A save of the note's current state.
    pub fn save(entity_id: impl Into<NoteId>, timestamp: Timestamp) -> Self {
        Self::new(OperationKind::Save, entity_id, timestamp)
    }

    /// A removal of the note from the remote store.
    pub fn delete(entity_id: impl Into<NoteId>, timestamp: Timestamp) -> Self {
        Self::new(OperationKind::Delete, entity_id, timestamp)
    }

    /// Whether replay should still attempt this entry under the given cap.
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}
