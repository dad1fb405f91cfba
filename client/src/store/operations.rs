//! Queries for the sync_operations table (the pending log).

use crate::error::Error;
use noteline_engine::{OperationKind, OperationSeq, PendingOperation};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};

/// A stored pending-log row.
#[derive(Debug)]
pub struct StoredOperation {
    pub id: i64,
    pub operation: String,
    pub entity_type: String,
    pub entity_id: String,
    pub timestamp: i64,
    pub retry_count: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredOperation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredOperation {
            id: row.try_get("id")?,
            operation: row.try_get("operation")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            timestamp: row.try_get("timestamp")?,
            retry_count: row.try_get("retry_count")?,
        })
    }
}

impl StoredOperation {
    /// Convert a row into a PendingOperation.
    pub fn into_operation(self) -> Result<PendingOperation, Error> {
        let operation: OperationKind = self.operation.parse()?;

        Ok(PendingOperation {
            id: Some(self.id),
            operation,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            timestamp: self.timestamp as u64,
            retry_count: self.retry_count.max(0) as u32,
        })
    }
}

/// Append an operation. Returns its sequence number.
pub async fn insert_operation(
    executor: impl SqliteExecutor<'_>,
    op: &PendingOperation,
) -> Result<OperationSeq, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO sync_operations (operation, entity_type, entity_id, timestamp, retry_count)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(op.operation.as_str())
    .bind(&op.entity_type)
    .bind(&op.entity_id)
    .bind(op.timestamp as i64)
    .bind(op.retry_count as i64)
    .fetch_one(executor)
    .await?;

    row.try_get("id")
}

/// All operations in replay order.
pub async fn get_all_operations(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<StoredOperation>, sqlx::Error> {
    sqlx::query_as::<_, StoredOperation>(
        r#"
        SELECT id, operation, entity_type, entity_id, timestamp, retry_count
        FROM sync_operations
        ORDER BY id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// The oldest operation that has not hit the retry cap.
pub async fn get_next_operation(
    executor: impl SqliteExecutor<'_>,
    max_retries: u32,
) -> Result<Option<StoredOperation>, sqlx::Error> {
    sqlx::query_as::<_, StoredOperation>(
        r#"
        SELECT id, operation, entity_type, entity_id, timestamp, retry_count
        FROM sync_operations
        WHERE retry_count < ?1
        ORDER BY id ASC
        LIMIT 1
        "#,
    )
    .bind(max_retries as i64)
    .fetch_optional(executor)
    .await
}

/// Delete one operation. Returns whether it existed.
pub async fn delete_operation(
    executor: impl SqliteExecutor<'_>,
    seq: OperationSeq,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM sync_operations WHERE id = ?1"#)
        .bind(seq)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every operation of `kind` targeting a note.
pub async fn delete_operations_for(
    executor: impl SqliteExecutor<'_>,
    entity_id: &str,
    kind: OperationKind,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM sync_operations
        WHERE entity_id = ?1 AND operation = ?2
        "#,
    )
    .bind(entity_id)
    .bind(kind.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Bump the retry count of one operation. Returns the new count, or `None`
/// if the operation is gone.
pub async fn increment_retry(
    executor: impl SqliteExecutor<'_>,
    seq: OperationSeq,
) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE sync_operations
        SET retry_count = retry_count + 1
        WHERE id = ?1
        RETURNING retry_count
        "#,
    )
    .bind(seq)
    .fetch_optional(executor)
    .await?;

    row.map(|r| r.try_get("retry_count")).transpose()
}

/// Zero every retry count. Returns the number of operations touched.
pub async fn reset_retries(executor: impl SqliteExecutor<'_>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"UPDATE sync_operations SET retry_count = 0 WHERE retry_count > 0"#)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Number of distinct notes with at least one queued operation.
pub async fn count_pending_entities(executor: impl SqliteExecutor<'_>) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(r#"SELECT COUNT(DISTINCT entity_id) AS pending FROM sync_operations"#)
        .fetch_one(executor)
        .await?;

    row.try_get("pending")
}

/// Whether a delete is queued for a note.
pub async fn has_pending_delete(
    executor: impl SqliteExecutor<'_>,
    entity_id: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sync_operations WHERE entity_id = ?1 AND operation = 'delete'
        ) AS queued
        "#,
    )
    .bind(entity_id)
    .fetch_one(executor)
    .await?;

    row.try_get("queued")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_to_operation() {
        let row = StoredOperation {
            id: 7,
            operation: "delete".into(),
            entity_type: "note".into(),
            entity_id: "n1".into(),
            timestamp: 1000,
            retry_count: 2,
        };

        let op = row.into_operation().unwrap();

        assert_eq!(op.id, Some(7));
        assert_eq!(op.operation, OperationKind::Delete);
        assert_eq!(op.retry_count, 2);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let row = StoredOperation {
            id: 1,
            operation: "patch".into(),
            entity_type: "note".into(),
            entity_id: "n1".into(),
            timestamp: 0,
            retry_count: 0,
        };

        assert!(matches!(
            row.into_operation(),
            Err(Error::StorageUnavailable(_))
        ));
    }
}
