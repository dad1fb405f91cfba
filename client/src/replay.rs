//! Replay of the pending log against the remote store.
//!
//! A pass walks the log oldest first and stops at the first delivery
//! failure, leaving that entry and everything after it queued. Entries that
//! have failed `max_retries` times are parked: they stay in the log, their
//! note is marked `error`, and later passes skip them until retries are
//! reset.

use crate::channel::SyncChannel;
use crate::error::{Error, Result};
use crate::remote::RemoteNoteStore;
use crate::store::LocalStore;
use noteline_engine::{OperationKind, PendingOperation, SyncMessage};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How a replay pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayReport {
    /// Every eligible entry was delivered.
    Drained { delivered: Vec<PendingOperation> },
    /// Delivery of `failed` failed; later entries were not attempted.
    Stopped {
        delivered: Vec<PendingOperation>,
        failed: PendingOperation,
        reason: String,
    },
    /// Another pass was already running; this trigger joined it.
    Collapsed,
}

impl ReplayReport {
    pub fn delivered(&self) -> &[PendingOperation] {
        match self {
            ReplayReport::Drained { delivered } | ReplayReport::Stopped { delivered, .. } => {
                delivered
            }
            ReplayReport::Collapsed => &[],
        }
    }

    pub fn is_drained(&self) -> bool {
        matches!(self, ReplayReport::Drained { .. })
    }
}

/// Drains the pending log in order.
pub struct ReplayEngine {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteNoteStore>,
    channel: SyncChannel,
    max_retries: u32,
    in_flight: Mutex<()>,
}

impl fmt::Debug for ReplayEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayEngine")
            .field("max_retries", &self.max_retries)
            .field("running", &self.is_running())
            .finish()
    }
}

impl ReplayEngine {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteNoteStore>,
        channel: SyncChannel,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            remote,
            channel,
            max_retries: max_retries.max(1),
            in_flight: Mutex::new(()),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether a pass is in flight right now.
    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Run one pass over the pending log.
    ///
    /// Publishes `sync-start`, one `sync-success` per delivered entry and
    /// exactly one terminal message. A trigger that arrives while a pass is
    /// running returns [`ReplayReport::Collapsed`] without publishing
    /// anything. Delivery failures are reported in the returned report; only
    /// local storage failures come back as `Err`.
    pub async fn replay(&self) -> Result<ReplayReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Replay already in flight; trigger collapsed");
            return Ok(ReplayReport::Collapsed);
        };

        self.channel.publish(SyncMessage::SyncStart);

        let mut delivered = Vec::new();
        let outcome = self.drain(&mut delivered).await;

        match self.store.pending_count().await {
            Ok(count) => self.channel.set_pending_count(count),
            Err(e) => warn!(error = %e, "Could not refresh pending count after replay"),
        }

        match outcome {
            Ok(None) => {
                info!(delivered = delivered.len(), "Pending log drained");
                self.channel.publish(SyncMessage::SyncComplete);
                Ok(ReplayReport::Drained { delivered })
            }
            Ok(Some((failed, reason))) => {
                self.channel.publish(SyncMessage::error(
                    reason.clone(),
                    Some(failed.entity_id.clone()),
                ));
                Ok(ReplayReport::Stopped {
                    delivered,
                    failed,
                    reason,
                })
            }
            Err(e) => {
                self.channel.publish(SyncMessage::error(e.to_string(), None));
                Err(e)
            }
        }
    }

    /// Deliver entries until the log is empty or one fails.
    ///
    /// Returns the failed entry and its reason, if any.
    async fn drain(
        &self,
        delivered: &mut Vec<PendingOperation>,
    ) -> Result<Option<(PendingOperation, String)>> {
        while let Some(op) = self.store.next_operation(self.max_retries).await? {
            match self.deliver(&op).await {
                Ok(()) => {
                    debug!(
                        seq = ?op.id,
                        note_id = %op.entity_id,
                        operation = %op.operation,
                        "Operation delivered"
                    );
                    self.channel
                        .publish(SyncMessage::success(op.entity_id.clone(), op.operation));
                    delivered.push(op);
                }
                Err(e @ Error::StorageUnavailable(_)) => return Err(e),
                Err(e) => {
                    self.record_failure(&op, &e).await?;
                    return Ok(Some((op, e.to_string())));
                }
            }
        }
        Ok(None)
    }

    async fn deliver(&self, op: &PendingOperation) -> Result<()> {
        match op.operation {
            OperationKind::Save => {
                let Some(note) = self.store.get(&op.entity_id).await? else {
                    // The note was removed after this save was queued.
                    if let Some(seq) = op.id {
                        self.store.dequeue_operation(seq).await?;
                    }
                    return Ok(());
                };
                self.remote.save(&note).await?;
                self.store
                    .acknowledge_save(&note.id, op.id, note.updated_at)
                    .await?;
            }
            OperationKind::Delete => {
                match self.remote.delete(&op.entity_id).await {
                    Ok(()) => {}
                    Err(Error::NotFound(_)) => {
                        debug!(note_id = %op.entity_id, "Remote delete of unknown note treated as done");
                    }
                    Err(e) => return Err(e),
                }
                self.store.acknowledge_delete(&op.entity_id).await?;
            }
        }
        Ok(())
    }

    async fn record_failure(&self, op: &PendingOperation, error: &Error) -> Result<()> {
        let Some(seq) = op.id else {
            return Ok(());
        };
        let retries = self.store.record_failure(seq).await?;

        if retries >= self.max_retries {
            warn!(
                seq,
                note_id = %op.entity_id,
                retries,
                error = %error,
                "Operation parked after repeated failures"
            );
            self.store.mark_error(&op.entity_id).await?;
        } else {
            warn!(seq, note_id = %op.entity_id, retries, error = %error, "Operation delivery failed");
        }
        Ok(())
    }
}
