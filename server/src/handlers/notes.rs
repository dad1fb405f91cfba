//! Note handlers - validate requests and apply them to the repository.

use crate::error::{AppError, Result};
use crate::repo::NoteRepository;
use noteline_engine::{Note, NoteId, Timestamp};
use serde::{Deserialize, Serialize};

/// Title given to notes created without one.
pub const DEFAULT_TITLE: &str = "New note";

/// Request body for create and update.
///
/// Every field is optional; `syncStatus` and `lastSynced` sent by clients are
/// ignored since the server owns them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub id: Option<NoteId>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl NoteInput {
    /// Overlay the provided fields on `base`.
    ///
    /// `updatedAt` falls back to `now` so a write without one still counts as
    /// the newest version.
    fn apply(self, mut base: Note, now: Timestamp) -> Note {
        if let Some(title) = self.title {
            base.title = title;
        }
        if let Some(content) = self.content {
            base.content = content;
        }
        if let Some(tags) = self.tags {
            base.tags = tags;
        }
        if let Some(created_at) = self.created_at {
            base.created_at = created_at;
        }
        base.updated_at = self.updated_at.unwrap_or(now);
        base
    }
}

/// Response for a successful delete.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    pub success: bool,
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("note id must not be empty".into()));
    }
    Ok(())
}

/// All notes, most recently updated first.
pub fn handle_list(repo: &NoteRepository) -> Vec<Note> {
    repo.list()
}

/// One note by id.
pub fn handle_get(repo: &NoteRepository, id: &str) -> Result<Note> {
    repo.get(id)
        .ok_or_else(|| AppError::NotFound(format!("note {id} not found")))
}

/// Create a note under the id chosen by the client.
pub fn handle_create(repo: &NoteRepository, input: NoteInput) -> Result<Note> {
    let id = input
        .id
        .clone()
        .ok_or_else(|| AppError::BadRequest("note id is required".into()))?;
    require_id(&id)?;

    let now = repo.now();
    let base = repo
        .get(&id)
        .unwrap_or_else(|| Note::new(&id, DEFAULT_TITLE, "", now));
    let note = input.apply(base, now);
    note.validate()?;

    tracing::info!(note_id = %id, "Note created");
    Ok(repo.upsert(note))
}

/// Create or replace the note at `id`. The path id wins over any id in the body.
pub fn handle_put(repo: &NoteRepository, id: &str, input: NoteInput) -> Result<Note> {
    require_id(id)?;

    let now = repo.now();
    let (base, created) = match repo.get(id) {
        Some(existing) => (existing, false),
        None => (Note::new(id, DEFAULT_TITLE, "", now), true),
    };
    let note = input.apply(base, now);

    if created {
        tracing::info!(note_id = %id, "Note created by update");
    }
    Ok(repo.upsert(note))
}

/// Remove the note at `id`.
pub fn handle_delete(repo: &NoteRepository, id: &str) -> Result<DeleteResponse> {
    if !repo.delete(id) {
        return Err(AppError::NotFound(format!("note {id} not found")));
    }
    tracing::info!(note_id = %id, "Note deleted");
    Ok(DeleteResponse { success: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use noteline_engine::{ManualClock, SyncStatus};
    use std::sync::Arc;

    fn repo() -> NoteRepository {
        NoteRepository::new(Arc::new(ManualClock::new(5_000)))
    }

    #[test]
    fn put_creates_missing_note_with_defaults() {
        let repo = repo();

        let note = handle_put(
            &repo,
            "n1",
            NoteInput {
                content: Some("hello".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(note.id, "n1");
        assert_eq!(note.title, DEFAULT_TITLE);
        assert_eq!(note.content, "hello");
        assert_eq!(note.created_at, 5_000);
        assert_eq!(note.updated_at, 5_000);
        assert_eq!(note.sync_status, SyncStatus::Synced);
    }

    #[test]
    fn put_overlays_existing_note_and_keeps_client_timestamp() {
        let repo = repo();
        handle_put(
            &repo,
            "n1",
            NoteInput {
                title: Some("first".into()),
                tags: Some(vec!["a".into()]),
                updated_at: Some(1_000),
                ..Default::default()
            },
        )
        .unwrap();

        let note = handle_put(
            &repo,
            "n1",
            NoteInput {
                id: Some("other".into()),
                content: Some("edited".into()),
                updated_at: Some(2_000),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(note.id, "n1");
        assert_eq!(note.title, "first");
        assert_eq!(note.tags, vec!["a"]);
        assert_eq!(note.content, "edited");
        assert_eq!(note.updated_at, 2_000);
        assert!(repo.get("other").is_none());
    }

    #[test]
    fn create_requires_id() {
        let repo = repo();

        assert!(matches!(
            handle_create(&repo, NoteInput::default()),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            handle_create(
                &repo,
                NoteInput {
                    id: Some("  ".into()),
                    ..Default::default()
                }
            ),
            Err(AppError::BadRequest(_))
        ));
        assert!(repo.is_empty());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let repo = repo();

        assert!(matches!(
            handle_delete(&repo, "ghost"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn client_sync_fields_are_ignored() {
        let input: NoteInput = serde_json::from_str(
            r#"{"id":"n1","title":"t","content":"c","syncStatus":"pending","lastSynced":1}"#,
        )
        .unwrap();

        let note = handle_create(&repo(), input).unwrap();

        assert_eq!(note.sync_status, SyncStatus::Synced);
        assert_eq!(note.last_synced, Some(5_000));
    }
}
