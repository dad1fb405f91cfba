//! Queries for the notes table.

use crate::error::{storage, Error};
use noteline_engine::{Note, SyncStatus, Timestamp};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};

/// A stored note row.
#[derive(Debug)]
pub struct StoredNote {
    pub id: String,
    pub title: String,
    pub content: String,
    /// JSON array of strings
    pub tags: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub sync_status: String,
    pub last_synced: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredNote {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredNote {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            tags: row.try_get("tags")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            sync_status: row.try_get("sync_status")?,
            last_synced: row.try_get("last_synced")?,
        })
    }
}

impl StoredNote {
    /// Convert a row into a Note.
    pub fn into_note(self) -> Result<Note, Error> {
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| storage(format!("corrupt tags on note {}: {e}", self.id)))?;
        let sync_status: SyncStatus = self.sync_status.parse().map_err(storage)?;

        let created_at = from_column(self.created_at, &self.id)?;
        let updated_at = from_column(self.updated_at, &self.id)?;
        let last_synced = self
            .last_synced
            .map(|t| from_column(t, &self.id))
            .transpose()?;

        Ok(Note {
            id: self.id,
            title: self.title,
            content: self.content,
            tags,
            created_at,
            updated_at,
            sync_status,
            last_synced,
        })
    }
}

/// SQLite integers are signed; timestamps past `i64::MAX` would sort wrong.
fn to_column(value: Timestamp, field: &str, id: &str) -> Result<i64, Error> {
    i64::try_from(value)
        .map_err(|_| Error::InvalidNote(format!("{field} {value} of note {id} is out of range")))
}

fn from_column(value: i64, id: &str) -> Result<Timestamp, Error> {
    Timestamp::try_from(value)
        .map_err(|_| storage(format!("negative timestamp on note {id}")))
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Insert or fully replace a note.
pub async fn upsert_note(executor: impl SqliteExecutor<'_>, note: &Note) -> Result<(), Error> {
    let created_at = to_column(note.created_at, "createdAt", &note.id)?;
    let updated_at = to_column(note.updated_at, "updatedAt", &note.id)?;
    let last_synced = note
        .last_synced
        .map(|t| to_column(t, "lastSynced", &note.id))
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO notes (
            id, title, content, tags, created_at, updated_at, sync_status, last_synced
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            tags = excluded.tags,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            sync_status = excluded.sync_status,
            last_synced = excluded.last_synced
        "#,
    )
    .bind(&note.id)
    .bind(&note.title)
    .bind(&note.content)
    .bind(encode_tags(&note.tags))
    .bind(created_at)
    .bind(updated_at)
    .bind(note.sync_status.as_str())
    .bind(last_synced)
    .execute(executor)
    .await
    .map_err(storage)?;

    Ok(())
}

/// Get a note by ID.
pub async fn get_note(
    executor: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<StoredNote>, sqlx::Error> {
    sqlx::query_as::<_, StoredNote>(
        r#"
        SELECT id, title, content, tags, created_at, updated_at, sync_status, last_synced
        FROM notes
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Get all notes, most recently updated first.
pub async fn get_all_notes(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<StoredNote>, sqlx::Error> {
    sqlx::query_as::<_, StoredNote>(
        r#"
        SELECT id, title, content, tags, created_at, updated_at, sync_status, last_synced
        FROM notes
        ORDER BY updated_at DESC, id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// Get notes with the given sync status (uses the sync_status index).
pub async fn get_notes_by_status(
    executor: impl SqliteExecutor<'_>,
    status: SyncStatus,
) -> Result<Vec<StoredNote>, sqlx::Error> {
    sqlx::query_as::<_, StoredNote>(
        r#"
        SELECT id, title, content, tags, created_at, updated_at, sync_status, last_synced
        FROM notes
        WHERE sync_status = ?1
        ORDER BY updated_at DESC, id ASC
        "#,
    )
    .bind(status.as_str())
    .fetch_all(executor)
    .await
}

/// Set the sync status of a note. Returns whether the note exists.
pub async fn set_status(
    executor: impl SqliteExecutor<'_>,
    id: &str,
    status: SyncStatus,
    last_synced: Option<u64>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE notes
        SET sync_status = ?2,
            last_synced = COALESCE(?3, last_synced)
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(last_synced.map(|t| t as i64))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a note. Returns whether a row was removed.
pub async fn delete_note(executor: impl SqliteExecutor<'_>, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM notes WHERE id = ?1"#)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
