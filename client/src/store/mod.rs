//! Durable local store for notes and the pending log.
//!
//! Every mutation that must stay consistent with the pending log runs inside
//! a single SQLite transaction: a pending save is never stored without its
//! queued operation, and a note is never flipped to `synced` while a newer
//! edit is still queued.

pub mod notes;
pub mod operations;
pub mod pool;

use crate::error::{storage, Error, Result};
use noteline_engine::clock::{next_update, Clock};
use noteline_engine::merge::{resolve, MergeOutcome, MergeReport, Resolution};
use noteline_engine::{
    Note, NoteDraft, NoteId, OperationKind, OperationSeq, PendingOperation, SyncStatus, Timestamp,
};
use pool::Pool;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// In-memory SQLite URL, handy for tests and ephemeral sessions.
pub const MEMORY_URL: &str = "sqlite::memory:";

/// Local store over SQLite.
///
/// The database is opened lazily by the first call that needs it; `init` only
/// makes that moment explicit. Concurrent first calls share one open.
pub struct LocalStore {
    database_url: String,
    clock: Arc<dyn Clock>,
    pool: OnceCell<Pool>,
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("database_url", &self.database_url)
            .field("initialized", &self.pool.initialized())
            .finish()
    }
}

impl LocalStore {
    pub fn new(database_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            database_url: database_url.into(),
            clock,
            pool: OnceCell::new(),
        }
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(MEMORY_URL, clock)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Open the database and run migrations. Idempotent.
    pub async fn init(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    async fn pool(&self) -> Result<&Pool> {
        self.pool
            .get_or_try_init(|| async move {
                let pool = pool::create_pool(&self.database_url)
                    .await
                    .map_err(storage)?;
                pool::run_migrations(&pool).await.map_err(storage)?;
                info!(url = %self.database_url, "Local store opened");
                Ok::<_, Error>(pool)
            })
            .await
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    /// Create or replace a note from caller content.
    ///
    /// Assigns an id when the draft has none, keeps `createdAt` of an
    /// existing note and advances `updatedAt`. Unless the draft names a
    /// status the note becomes `pending` and a save is queued in the same
    /// transaction. An explicit `synced` status clears queued saves.
    pub async fn put(&self, draft: NoteDraft) -> Result<NoteId> {
        let pool = self.pool().await?;
        let id = draft
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = self.clock.now();
        let status = draft.sync_status.unwrap_or_default();

        let mut tx = pool.begin().await.map_err(storage)?;

        let existing = notes::get_note(&mut *tx, &id)
            .await
            .map_err(storage)?
            .map(notes::StoredNote::into_note)
            .transpose()?;

        let note = Note {
            id: id.clone(),
            title: draft.title,
            content: draft.content,
            tags: draft.tags,
            created_at: existing.as_ref().map_or(now, |n| n.created_at),
            updated_at: next_update(existing.as_ref().map(|n| n.updated_at), now),
            sync_status: status,
            last_synced: match status {
                SyncStatus::Synced => Some(now),
                _ => existing.and_then(|n| n.last_synced),
            },
        };

        notes::upsert_note(&mut *tx, &note).await?;
        match status {
            SyncStatus::Pending => {
                operations::insert_operation(&mut *tx, &PendingOperation::save(&id, now))
                    .await
                    .map_err(storage)?;
            }
            // Nothing left to confirm for this version.
            SyncStatus::Synced => {
                operations::delete_operations_for(&mut *tx, &id, OperationKind::Save)
                    .await
                    .map_err(storage)?;
            }
            SyncStatus::Error => {}
        }

        tx.commit().await.map_err(storage)?;

        debug!(note_id = %id, status = %status, updated_at = note.updated_at, "Note stored");
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Note>> {
        let pool = self.pool().await?;
        notes::get_note(pool, id)
            .await
            .map_err(storage)?
            .map(notes::StoredNote::into_note)
            .transpose()
    }

    /// All notes, most recently updated first.
    pub async fn list(&self) -> Result<Vec<Note>> {
        let pool = self.pool().await?;
        notes::get_all_notes(pool)
            .await
            .map_err(storage)?
            .into_iter()
            .map(notes::StoredNote::into_note)
            .collect()
    }

    pub async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<Note>> {
        let pool = self.pool().await?;
        notes::get_notes_by_status(pool, status)
            .await
            .map_err(storage)?
            .into_iter()
            .map(notes::StoredNote::into_note)
            .collect()
    }

    /// Set a note to `synced` with `lastSynced = now`. Absent notes are a no-op.
    pub async fn mark_synced(&self, id: &str) -> Result<()> {
        let pool = self.pool().await?;
        let found = notes::set_status(pool, id, SyncStatus::Synced, Some(self.clock.now()))
            .await
            .map_err(storage)?;
        if !found {
            debug!(note_id = %id, "mark_synced on missing note ignored");
        }
        Ok(())
    }

    /// Set a note to `error`. Absent notes are a no-op.
    pub async fn mark_error(&self, id: &str) -> Result<()> {
        let pool = self.pool().await?;
        notes::set_status(pool, id, SyncStatus::Error, None)
            .await
            .map_err(storage)?;
        Ok(())
    }

    /// Delete a note locally and queue its remote delete.
    ///
    /// Queued saves of the note are dropped with it.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let pool = self.pool().await?;
        let now = self.clock.now();

        let mut tx = pool.begin().await.map_err(storage)?;

        if !notes::delete_note(&mut *tx, id).await.map_err(storage)? {
            return Err(Error::NotFound(id.to_string()));
        }
        let dropped = operations::delete_operations_for(&mut *tx, id, OperationKind::Save)
            .await
            .map_err(storage)?;
        operations::insert_operation(&mut *tx, &PendingOperation::delete(id, now))
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        debug!(note_id = %id, dropped_saves = dropped, "Note removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pending log
    // ------------------------------------------------------------------

    /// Append an operation to the pending log.
    pub async fn enqueue_operation(&self, op: PendingOperation) -> Result<OperationSeq> {
        let pool = self.pool().await?;
        operations::insert_operation(pool, &op)
            .await
            .map_err(storage)
    }

    /// Every queued operation, in replay order.
    pub async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>> {
        let pool = self.pool().await?;
        operations::get_all_operations(pool)
            .await
            .map_err(storage)?
            .into_iter()
            .map(operations::StoredOperation::into_operation)
            .collect()
    }

    /// Remove one operation. Returns whether it was queued.
    pub async fn dequeue_operation(&self, seq: OperationSeq) -> Result<bool> {
        let pool = self.pool().await?;
        operations::delete_operation(pool, seq)
            .await
            .map_err(storage)
    }

    /// Number of notes with at least one queued operation.
    pub async fn pending_count(&self) -> Result<usize> {
        let pool = self.pool().await?;
        let count = operations::count_pending_entities(pool)
            .await
            .map_err(storage)?;
        Ok(count.max(0) as usize)
    }

    /// The oldest operation still below the retry cap.
    pub async fn next_operation(&self, max_retries: u32) -> Result<Option<PendingOperation>> {
        let pool = self.pool().await?;
        operations::get_next_operation(pool, max_retries)
            .await
            .map_err(storage)?
            .map(operations::StoredOperation::into_operation)
            .transpose()
    }

    /// Count a failed delivery. Returns the new retry count (0 if the
    /// operation is no longer queued).
    pub async fn record_failure(&self, seq: OperationSeq) -> Result<u32> {
        let pool = self.pool().await?;
        let count = operations::increment_retry(pool, seq)
            .await
            .map_err(storage)?;
        Ok(count.unwrap_or(0).max(0) as u32)
    }

    /// Zero every retry count, making parked operations eligible again.
    pub async fn reset_retries(&self) -> Result<u64> {
        let pool = self.pool().await?;
        operations::reset_retries(pool).await.map_err(storage)
    }

    /// Settle a delivered save.
    ///
    /// If the note still carries `sent_updated_at`, nothing newer is waiting:
    /// the note becomes `synced` and every queued save for it is dropped.
    /// Otherwise a later edit happened mid-flight; only the delivered entry
    /// `seq` is dropped and the note stays `pending`. Returns whether the note
    /// was marked synced.
    pub async fn acknowledge_save(
        &self,
        id: &str,
        seq: Option<OperationSeq>,
        sent_updated_at: Timestamp,
    ) -> Result<bool> {
        let pool = self.pool().await?;
        let now = self.clock.now();

        let mut tx = pool.begin().await.map_err(storage)?;

        let current = notes::get_note(&mut *tx, id)
            .await
            .map_err(storage)?
            .map(|n| n.updated_at as u64);

        let synced = match current {
            Some(updated_at) if updated_at == sent_updated_at => {
                notes::set_status(&mut *tx, id, SyncStatus::Synced, Some(now))
                    .await
                    .map_err(storage)?;
                operations::delete_operations_for(&mut *tx, id, OperationKind::Save)
                    .await
                    .map_err(storage)?;
                true
            }
            _ => {
                if let Some(seq) = seq {
                    operations::delete_operation(&mut *tx, seq)
                        .await
                        .map_err(storage)?;
                }
                false
            }
        };

        tx.commit().await.map_err(storage)?;

        if !synced {
            debug!(note_id = %id, "Save acknowledged for an older version; note stays pending");
        }
        Ok(synced)
    }

    /// Settle a delivered delete.
    pub async fn acknowledge_delete(&self, id: &str) -> Result<()> {
        let pool = self.pool().await?;
        operations::delete_operations_for(pool, id, OperationKind::Delete)
            .await
            .map_err(storage)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Merge
    // ------------------------------------------------------------------

    /// Apply a remote snapshot with last-writer-wins.
    ///
    /// Each remote note is resolved and written in its own transaction,
    /// against a fresh read of the local row, so an edit made while the
    /// snapshot was in flight is never clobbered by an older remote copy.
    /// A note whose transaction fails lands in [`MergeReport::failed`]
    /// and the rest of the snapshot is still applied.
    pub async fn merge(&self, remote: Vec<Note>) -> Result<MergeOutcome> {
        let pool = self.pool().await?;
        let now = self.clock.now();
        let mut report = MergeReport::default();

        for note in &remote {
            match Self::merge_one(pool, note, now).await {
                Ok(resolution) => report.record(note.id.clone(), resolution),
                Err(e) => {
                    warn!(note_id = %note.id, error = %e, "Remote note skipped");
                    report.record_failure(note.id.clone(), e.to_string());
                }
            }
        }

        if !report.kept_deleted.is_empty() {
            warn!(
                count = report.kept_deleted.len(),
                "Remote notes with a queued local delete were not restored"
            );
        }
        info!(
            remote = remote.len(),
            inserted = report.inserted.len(),
            overwritten = report.overwritten.len(),
            kept_pending = report.kept_pending.len(),
            failed = report.failed.len(),
            "Merged remote snapshot"
        );

        Ok(MergeOutcome {
            notes: self.list().await?,
            report,
        })
    }

    async fn merge_one(pool: &Pool, remote: &Note, now: Timestamp) -> Result<Resolution> {
        remote.validate()?;

        let mut tx = pool.begin().await.map_err(storage)?;

        let local = notes::get_note(&mut *tx, &remote.id)
            .await
            .map_err(storage)?
            .map(notes::StoredNote::into_note)
            .transpose()?;
        let deleted = operations::has_pending_delete(&mut *tx, &remote.id)
            .await
            .map_err(storage)?;

        let resolution = resolve(local.as_ref(), remote, deleted);

        if resolution.writes() {
            notes::upsert_note(&mut *tx, &Note::from_remote(remote, now)).await?;
        }
        if resolution == Resolution::Overwrite {
            // The local edit lost; replaying it would undo the newer remote copy.
            operations::delete_operations_for(&mut *tx, &remote.id, OperationKind::Save)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(resolution)
    }
}
