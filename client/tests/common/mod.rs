//! Shared fixtures for client integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use noteline_client::{LocalStore, RemoteNoteStore, SyncOrchestrator};
use noteline_engine::{Error, ManualClock, Note, NoteId, SyncStatus, Timestamp};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const START: Timestamp = 1_000;
pub const MAX_RETRIES: u32 = 3;

/// A request seen by the mock remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchAll,
    Save { id: NoteId, content: String },
    Delete(NoteId),
}

/// In-memory remote store with scripted failures.
#[derive(Default)]
pub struct MockRemote {
    notes: Mutex<BTreeMap<NoteId, Note>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<NoteId>>,
    down: AtomicBool,
    gated: AtomicBool,
    /// Signalled when a gated save has started
    pub entered: Notify,
    /// Releases a gated save
    pub release: Notify,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a note on the remote side without recording a call.
    pub fn seed(&self, note: Note) {
        self.notes.lock().unwrap().insert(note.id.clone(), note);
    }

    pub fn note(&self, id: &str) -> Option<Note> {
        self.notes.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.notes.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn saves_of(&self, id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Save { id: saved, .. } if saved == id))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make every save or delete of `id` fail.
    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn heal(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    /// Make every call fail.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Hold the next save until `release` is notified.
    pub fn gate_next_save(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, id: Option<&str>) -> Result<(), Error> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::Unreachable("connection refused".into()));
        }
        if let Some(id) = id {
            if self.failing.lock().unwrap().contains(id) {
                return Err(Error::Unreachable(format!("HTTP 503 for {id}")));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteNoteStore for MockRemote {
    async fn fetch_all(&self) -> Result<Vec<Note>, Error> {
        self.record(Call::FetchAll);
        self.check(None)?;
        Ok(self.notes.lock().unwrap().values().cloned().collect())
    }

    async fn save(&self, note: &Note) -> Result<Note, Error> {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        self.record(Call::Save {
            id: note.id.clone(),
            content: note.content.clone(),
        });
        self.check(Some(&note.id))?;

        let mut stored = note.clone();
        stored.mark_synced(note.updated_at);
        self.notes
            .lock()
            .unwrap()
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        self.record(Call::Delete(id.to_string()));
        self.check(Some(id))?;

        match self.notes.lock().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(id.to_string())),
        }
    }
}

/// An orchestrator over an in-memory store and a mock remote.
pub struct Harness {
    pub sync: Arc<SyncOrchestrator>,
    pub store: Arc<LocalStore>,
    pub remote: Arc<MockRemote>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new(online: bool) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(LocalStore::in_memory(clock.clone()));
        let remote = Arc::new(MockRemote::new());
        let sync = Arc::new(SyncOrchestrator::new(
            store.clone(),
            remote.clone(),
            MAX_RETRIES,
            online,
        ));
        store.init().await.unwrap();

        Self {
            sync,
            store,
            remote,
            clock,
        }
    }

    /// Advance the clock by one second.
    pub fn tick(&self) -> Timestamp {
        self.clock.advance(1_000)
    }
}

/// A note as the remote would hold it.
pub fn remote_note(id: &str, content: &str, updated_at: Timestamp) -> Note {
    let mut note = Note::new(id, format!("title {id}"), content, START);
    note.updated_at = updated_at;
    note.sync_status = SyncStatus::Synced;
    note.last_synced = Some(updated_at);
    note
}
