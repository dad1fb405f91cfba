//! Sync message channel.
//!
//! Carries lifecycle and connectivity messages between the replay engine,
//! the orchestrator and any observers (UI, platform worker). Each published
//! message is first applied to the shared [`SyncState`], then broadcast in a
//! versioned [`Envelope`].

use noteline_engine::{Clock, Envelope, FollowUp, SyncMessage, SyncState};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Buffered envelopes per subscriber before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 64;

/// Shared message bus plus the state it drives.
///
/// Cheap to clone; clones publish to the same subscribers and state.
#[derive(Clone)]
pub struct SyncChannel {
    sender: broadcast::Sender<Envelope>,
    state: Arc<watch::Sender<SyncState>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SyncChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncChannel")
            .field("subscribers", &self.sender.receiver_count())
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl SyncChannel {
    pub fn new(is_online: bool, clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity(is_online, clock, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(is_online: bool, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (state, _) = watch::channel(SyncState::new(is_online));

        Self {
            sender,
            state: Arc::new(state),
            clock,
        }
    }

    /// Apply `message` to the state, then broadcast it.
    ///
    /// Returns the follow-up the state machine asks for, if any.
    pub fn publish(&self, message: SyncMessage) -> Option<FollowUp> {
        let now = self.clock.now();
        let mut follow_up = None;
        self.state.send_modify(|state| follow_up = state.apply(&message, now));

        tracing::debug!(kind = message.kind(), follow_up = ?follow_up, "Sync message published");

        // No subscribers is fine; the state is already updated.
        let _ = self.sender.send(Envelope::new(message));

        follow_up
    }

    /// Record the current size of the pending log.
    pub fn set_pending_count(&self, count: usize) {
        self.state.send_if_modified(|state| {
            let changed = state.pending_count != count;
            state.pending_count = count;
            changed
        });
    }

    /// Receive every envelope published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Observe state changes.
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
