//! In-memory note repository.
//!
//! Holds the authoritative copy of every note. Writes stamp the note as
//! `synced` at the server's time but keep the client's `updatedAt`, so
//! last-writer-wins on the clients compares the edit times they produced.

use dashmap::DashMap;
use noteline_engine::{Clock, Note, NoteId, SyncStatus, SystemClock};
use std::sync::Arc;

/// Thread-safe note store, shared across handlers via `Arc`.
#[derive(Debug)]
pub struct NoteRepository {
    notes: DashMap<NoteId, Note>,
    clock: Arc<dyn Clock>,
}

impl Default for NoteRepository {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl NoteRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            notes: DashMap::new(),
            clock,
        }
    }

    /// Create a repository wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Every note, most recently updated first.
    pub fn list(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.notes.iter().map(|e| e.value().clone()).collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        notes
    }

    pub fn get(&self, id: &str) -> Option<Note> {
        self.notes.get(id).map(|e| e.value().clone())
    }

    /// Store `note`, replacing any note with the same id.
    pub fn upsert(&self, mut note: Note) -> Note {
        note.sync_status = SyncStatus::Synced;
        note.last_synced = Some(self.clock.now());
        self.notes.insert(note.id.clone(), note.clone());

        tracing::debug!(note_id = %note.id, updated_at = note.updated_at, "Note stored");
        note
    }

    /// Remove a note. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.notes.remove(id).is_some();
        if removed {
            tracing::debug!(note_id = %id, "Note deleted");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
