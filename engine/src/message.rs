//! Sync message protocol shared by the client runtime and the background
//! sync worker.
//!
//! Messages are JSON-encoded, tagged by `type` in kebab-case, and carried in a
//! versioned [`Envelope`].

use crate::{NoteId, OperationKind};
use serde::{Deserialize, Serialize};

/// Version of the message schema.
pub const PROTOCOL_VERSION: u32 = 1;

/// A notification exchanged between sync contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// A replay or full sync began.
    SyncStart,

    /// One queued operation was confirmed by the remote store.
    #[serde(rename_all = "camelCase")]
    SyncSuccess {
        entity_id: NoteId,
        operation: OperationKind,
    },

    /// A replay or full sync stopped on a failure.
    #[serde(rename_all = "camelCase")]
    SyncError {
        /// Note whose delivery failed, if the failure was per-entry
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entity_id: Option<NoteId>,
        /// Human-readable reason
        error: String,
    },

    /// A replay or full sync finished without failures.
    SyncComplete,

    /// Connectivity came back.
    ConnectionOnline,

    /// Connectivity was lost.
    ConnectionOffline,

    /// Platform background-sync callback asking for a replay.
    TriggerSync,
}

impl SyncMessage {
    /// Create an error message.
    pub fn error(error: impl Into<String>, entity_id: Option<NoteId>) -> Self {
        SyncMessage::SyncError {
            entity_id,
            error: error.into(),
        }
    }

    /// Create a per-entry success message.
    pub fn success(entity_id: impl Into<NoteId>, operation: OperationKind) -> Self {
        SyncMessage::SyncSuccess {
            entity_id: entity_id.into(),
            operation,
        }
    }

    /// The `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::SyncStart => "sync-start",
            SyncMessage::SyncSuccess { .. } => "sync-success",
            SyncMessage::SyncError { .. } => "sync-error",
            SyncMessage::SyncComplete => "sync-complete",
            SyncMessage::ConnectionOnline => "connection-online",
            SyncMessage::ConnectionOffline => "connection-offline",
            SyncMessage::TriggerSync => "trigger-sync",
        }
    }

    /// Whether the message ends a replay or sync pass.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncMessage::SyncComplete | SyncMessage::SyncError { .. }
        )
    }
}

/// Versioned wrapper placed around every message on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(flatten)]
    pub message: SyncMessage,
}

impl Envelope {
    pub fn new(message: SyncMessage) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            message,
        }
    }

    /// Whether this build understands the envelope's schema.
    pub fn is_supported(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}

impl From<SyncMessage> for Envelope {
    fn from(message: SyncMessage) -> Self {
        Envelope::new(message)
    }
}
