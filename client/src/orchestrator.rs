//! Sync orchestrator: the entry point applications talk to.
//!
//! Local mutations always land in the local store first. While online the
//! orchestrator also pushes them to the remote store right away; whatever
//! cannot be delivered stays in the pending log until the next replay.

use crate::channel::SyncChannel;
use crate::config::{ClientConfig, ConfigError};
use crate::error::{Error, Result};
use crate::remote::{HttpRemote, RemoteNoteStore};
use crate::replay::{ReplayEngine, ReplayReport};
use crate::store::LocalStore;
use noteline_engine::{
    Clock, Envelope, FollowUp, MergeReport, Note, NoteDraft, NoteId, SyncMessage, SyncState,
    SystemClock,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Result of a local create, update or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub id: NoteId,
    /// The remote store confirmed the change during the call.
    pub applied_remotely: bool,
    /// The note still has queued work.
    pub pending: bool,
}

/// Result of a pull-and-merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    /// Post-merge local notes, most recently updated first
    pub notes: Vec<Note>,
    pub report: MergeReport,
    pub pending_count: usize,
}

/// Result of a replay followed, when the log drained, by a full sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub replay: ReplayReport,
    pub summary: Option<SyncSummary>,
}

/// Coordinates the local store, the replay engine and the remote store.
pub struct SyncOrchestrator {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteNoteStore>,
    replay: ReplayEngine,
    channel: SyncChannel,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("store", &self.store)
            .field("replay", &self.replay)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteNoteStore>,
        max_retries: u32,
        is_online: bool,
    ) -> Self {
        let channel = SyncChannel::new(is_online, store.clock().clone());
        let replay = ReplayEngine::new(store.clone(), remote.clone(), channel.clone(), max_retries);

        Self {
            store,
            remote,
            replay,
            channel,
        }
    }

    /// Build an orchestrator over SQLite and the HTTP remote from `config`.
    pub fn from_config(
        config: &ClientConfig,
        is_online: bool,
    ) -> std::result::Result<Self, ConfigError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(LocalStore::new(&config.database_url, clock));
        let remote = Arc::new(HttpRemote::from_config(config)?);

        Ok(Self::new(store, remote, config.max_retries, is_online))
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn replay_engine(&self) -> &ReplayEngine {
        &self.replay
    }

    pub fn channel(&self) -> &SyncChannel {
        &self.channel
    }

    /// Receive every sync message published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.channel.subscribe()
    }

    /// Observe sync state changes.
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.channel.watch()
    }

    pub fn state(&self) -> SyncState {
        self.channel.state()
    }

    pub fn is_online(&self) -> bool {
        self.channel.is_online()
    }

    /// Open the local store and, when online with queued work, replay it.
    pub async fn load(&self) -> Result<Option<ReplayReport>> {
        self.store.init().await?;
        let pending = self.refresh_pending().await?;
        info!(pending, online = self.is_online(), "Sync orchestrator loaded");

        if self.is_online() && pending > 0 {
            return self.replay.replay().await.map(Some);
        }
        Ok(None)
    }

    /// All local notes, most recently updated first.
    pub async fn notes(&self) -> Result<Vec<Note>> {
        self.store.list().await
    }

    /// Create or update a note.
    ///
    /// The note is stored as `pending` with a queued save. While online the
    /// save is also sent immediately; if that fails the entry simply stays
    /// queued for the next replay.
    pub async fn apply_mutation(&self, mut draft: NoteDraft) -> Result<MutationOutcome> {
        draft.sync_status = None;
        let id = self.store.put(draft).await?;

        if !self.is_online() {
            self.refresh_pending().await?;
            return Ok(MutationOutcome {
                id,
                applied_remotely: false,
                pending: true,
            });
        }

        let note = self
            .store
            .get(&id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        let outcome = match self.remote.save(&note).await {
            Ok(_) => {
                let synced = self
                    .store
                    .acknowledge_save(&id, None, note.updated_at)
                    .await?;
                MutationOutcome {
                    id,
                    applied_remotely: true,
                    pending: !synced,
                }
            }
            Err(e) => {
                warn!(note_id = %id, error = %e, "Immediate save failed; left queued for replay");
                MutationOutcome {
                    id,
                    applied_remotely: false,
                    pending: true,
                }
            }
        };

        self.refresh_pending().await?;
        Ok(outcome)
    }

    /// Delete a note locally and, while online, remotely.
    ///
    /// Fails with [`Error::NotFound`] if the note does not exist locally.
    pub async fn delete(&self, id: &str) -> Result<MutationOutcome> {
        self.store.remove(id).await?;

        let applied_remotely = if self.is_online() {
            match self.remote.delete(id).await {
                Ok(()) | Err(Error::NotFound(_)) => {
                    self.store.acknowledge_delete(id).await?;
                    true
                }
                Err(e) => {
                    warn!(note_id = %id, error = %e, "Immediate delete failed; left queued for replay");
                    false
                }
            }
        } else {
            false
        };

        self.refresh_pending().await?;
        Ok(MutationOutcome {
            id: id.to_string(),
            applied_remotely,
            pending: !applied_remotely,
        })
    }

    /// Pull every remote note and merge it into the local store.
    ///
    /// Fails with [`Error::Unreachable`] while offline.
    pub async fn full_sync(&self) -> Result<SyncSummary> {
        if !self.is_online() {
            return Err(Error::Unreachable("client is offline".into()));
        }

        self.channel.publish(SyncMessage::SyncStart);

        match self.pull_and_merge().await {
            Ok(summary) => {
                self.channel.publish(SyncMessage::SyncComplete);
                Ok(summary)
            }
            Err(e) => {
                self.channel.publish(SyncMessage::error(e.to_string(), None));
                Err(e)
            }
        }
    }

    async fn pull_and_merge(&self) -> Result<SyncSummary> {
        let remote = self.remote.fetch_all().await?;
        let outcome = self.store.merge(remote).await?;
        let pending_count = self.refresh_pending().await?;

        Ok(SyncSummary {
            notes: outcome.notes,
            report: outcome.report,
            pending_count,
        })
    }

    /// Replay the pending log now.
    ///
    /// Fails with [`Error::Unreachable`] while offline.
    pub async fn sync_now(&self) -> Result<ReplayReport> {
        if !self.is_online() {
            return Err(Error::Unreachable("client is offline".into()));
        }
        self.replay.replay().await
    }

    /// Replay the pending log, then pull and merge if it drained.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let replay = self.sync_now().await?;

        let summary = if replay.is_drained() {
            Some(self.full_sync().await?)
        } else {
            debug!(?replay, "Skipping full sync; pending log not drained");
            None
        };

        Ok(CycleOutcome { replay, summary })
    }

    /// Make parked operations eligible again and run a cycle.
    pub async fn retry(&self) -> Result<CycleOutcome> {
        let reset = self.store.reset_retries().await?;
        info!(reset, "Retry counts reset");
        self.run_cycle().await
    }

    /// Report a connectivity change.
    pub async fn set_online(&self, online: bool) -> Result<Option<CycleOutcome>> {
        let message = if online {
            SyncMessage::ConnectionOnline
        } else {
            SyncMessage::ConnectionOffline
        };
        self.dispatch(message).await
    }

    /// Apply an inbound message and run whatever it triggers.
    ///
    /// An offline-to-online edge runs a full cycle; `trigger-sync` while
    /// online runs a replay.
    pub async fn dispatch(&self, message: SyncMessage) -> Result<Option<CycleOutcome>> {
        match self.channel.publish(message) {
            Some(FollowUp::RunCycle) => {
                info!("Connectivity restored; starting sync cycle");
                self.run_cycle().await.map(Some)
            }
            Some(FollowUp::Replay) => {
                let replay = self.replay.replay().await?;
                Ok(Some(CycleOutcome {
                    replay,
                    summary: None,
                }))
            }
            None => Ok(None),
        }
    }

    /// Accept an envelope from a platform channel.
    ///
    /// Envelopes with an unknown schema version are dropped.
    pub async fn dispatch_envelope(&self, envelope: Envelope) -> Result<Option<CycleOutcome>> {
        if !envelope.is_supported() {
            warn!(version = envelope.version, "Dropping envelope with unsupported version");
            return Ok(None);
        }
        self.dispatch(envelope.message).await
    }

    async fn refresh_pending(&self) -> Result<usize> {
        let count = self.store.pending_count().await?;
        self.channel.set_pending_count(count);
        Ok(count)
    }
}
