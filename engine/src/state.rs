//! Observable sync state and its transitions.
//!
//! The state changes only by applying [`SyncMessage`]s, one at a time, from a
//! single dispatcher. Applying a message may ask the dispatcher to start more
//! work through a [`FollowUp`].

use crate::{SyncMessage, Timestamp};
use serde::{Deserialize, Serialize};

/// Where the current or last sync pass stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing,
    Complete,
    Error {
        reason: String,
    },
}

/// Online/offline flag plus a latch remembering that we were offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectivity {
    pub is_online: bool,
    /// Set while offline; consumed by the first online observation
    pub was_offline: bool,
}

impl Connectivity {
    pub fn new(is_online: bool) -> Self {
        Self {
            is_online,
            was_offline: !is_online,
        }
    }

    /// Record a connectivity signal.
    ///
    /// Returns `true` exactly once per offline→online edge; repeated online
    /// signals do not count as new edges.
    pub fn observe(&mut self, online: bool) -> bool {
        if online {
            let edge = self.was_offline;
            self.is_online = true;
            self.was_offline = false;
            edge
        } else {
            self.is_online = false;
            self.was_offline = true;
            false
        }
    }
}

/// Work the dispatcher must start after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Replay the queue, then pull and merge the remote snapshot
    RunCycle,
    /// Replay the queue only
    Replay,
}

/// Everything a UI needs to render sync status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub phase: SyncPhase,
    pub connectivity: Connectivity,
    pub last_sync: Option<Timestamp>,
    pub last_error: Option<String>,
    /// Notes with at least one unconfirmed operation
    pub pending_count: usize,
}

impl SyncState {
    pub fn new(is_online: bool) -> Self {
        Self {
            phase: SyncPhase::Idle,
            connectivity: Connectivity::new(is_online),
            last_sync: None,
            last_error: None,
            pending_count: 0,
        }
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online
    }

    pub fn is_syncing(&self) -> bool {
        self.phase == SyncPhase::Syncing
    }

    /// Apply one message. `now` stamps `last_sync` on completion.
    pub fn apply(&mut self, message: &SyncMessage, now: Timestamp) -> Option<FollowUp> {
        match message {
            SyncMessage::SyncStart => {
                self.phase = SyncPhase::Syncing;
                None
            }
            SyncMessage::SyncSuccess { .. } => None,
            SyncMessage::SyncError { error, .. } => {
                self.phase = SyncPhase::Error {
                    reason: error.clone(),
                };
                self.last_error = Some(error.clone());
                None
            }
            SyncMessage::SyncComplete => {
                self.phase = SyncPhase::Complete;
                self.last_sync = Some(now);
                self.last_error = None;
                None
            }
            SyncMessage::ConnectionOnline => self
                .connectivity
                .observe(true)
                .then_some(FollowUp::RunCycle),
            SyncMessage::ConnectionOffline => {
                self.connectivity.observe(false);
                None
            }
            SyncMessage::TriggerSync => self.is_online().then_some(FollowUp::Replay),
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(true)
    }
}
