// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for crash-safe task handoff.

use chatrelay_core::RelayError;
use rusqlite::params;

use crate::database::Database;

/// A raw queue row as claimed by [`dequeue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRow {
    pub id: i64,
    pub payload: String,
    /// Times this entry has been claimed, including the current claim.
    pub attempts: i64,
}

/// Enqueue a new item. Returns the auto-generated queue entry ID.
pub async fn enqueue(db: &Database, queue_name: &str, payload: &str) -> Result<i64, RelayError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload) VALUES (?1, ?2)",
                params![queue_name, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim the oldest available entry from the named queue.
///
/// An entry is available when it is pending, or when it is processing but its
/// lock has lapsed (the previous consumer never acknowledged it). The select and
/// the lock update run in one transaction. Returns `None` if nothing is available.
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    lock_timeout_secs: u64,
) -> Result<Option<QueueRow>, RelayError> {
    let queue_name = queue_name.to_string();
    let lock_modifier = format!("+{lock_timeout_secs} seconds");
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let result = tx.query_row(
                "SELECT id, payload, attempts
                 FROM queue
                 WHERE queue_name = ?1
                   AND (status = 'pending'
                        OR (status = 'processing'
                            AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))
                 ORDER BY id ASC
                 LIMIT 1",
                params![queue_name],
                |row| {
                    Ok(QueueRow {
                        id: row.get(0)?,
                        payload: row.get(1)?,
                        attempts: row.get(2)?,
                    })
                },
            );

            match result {
                Ok(row) => {
                    tx.execute(
                        "UPDATE queue SET status = 'processing',
                         attempts = attempts + 1,
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![row.id, lock_modifier],
                    )?;
                    tx.commit()?;
                    Ok(Some(QueueRow {
                        attempts: row.attempts + 1,
                        ..row
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge an entry by deleting it. Unknown ids are a no-op.
pub async fn ack(db: &Database, id: i64) -> Result<(), RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of entries waiting to be claimed.
pub async fn pending_count(db: &Database, queue_name: &str) -> Result<usize, RelayError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue WHERE queue_name = ?1 AND status = 'pending'",
                params![queue_name],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn row_count(db: &Database) -> i64 {
        db.connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM queue", [], |row| row.get(0))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enqueue_and_dequeue_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "inbound", r#"{"msg":"hello"}"#).await.unwrap();
        assert!(id > 0);

        let row = dequeue(&db, "inbound", 300).await.unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.payload, r#"{"msg":"hello"}"#);
        assert_eq!(row.attempts, 1);

        // Claimed entry is locked.
        assert!(dequeue(&db, "inbound", 300).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dequeue_is_fifo() {
        let (db, _dir) = setup_db().await;
        for payload in ["a", "b", "c"] {
            enqueue(&db, "q", payload).await.unwrap();
        }
        let mut seen = Vec::new();
        while let Some(row) = dequeue(&db, "q", 300).await.unwrap() {
            seen.push(row.payload);
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn queues_are_isolated_by_name() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, "one", "x").await.unwrap();
        assert!(dequeue(&db, "two", 300).await.unwrap().is_none());
        assert_eq!(pending_count(&db, "one").await.unwrap(), 1);
        assert_eq!(pending_count(&db, "two").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ack_deletes_entry() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "test", "payload").await.unwrap();
        dequeue(&db, "test", 300).await.unwrap().unwrap();
        ack(&db, id).await.unwrap();
        assert_eq!(row_count(&db).await, 0);

        // Acking twice is harmless.
        ack(&db, id).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn lapsed_lock_is_redelivered() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "test", "payload").await.unwrap();
        dequeue(&db, "test", 300).await.unwrap().unwrap();

        // Simulate a consumer that crashed long ago.
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE queue SET locked_until = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let again = dequeue(&db, "test", 300).await.unwrap().unwrap();
        assert_eq!(again.id, id);
        assert_eq!(again.attempts, 2);
    }

    #[tokio::test]
    async fn pending_count_excludes_claimed() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, "q", "a").await.unwrap();
        enqueue(&db, "q", "b").await.unwrap();
        assert_eq!(pending_count(&db, "q").await.unwrap(), 2);
        dequeue(&db, "q", 300).await.unwrap().unwrap();
        assert_eq!(pending_count(&db, "q").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_producers_no_sqlite_busy() {
        let (db, _dir) = setup_db().await;
        let db = std::sync::Arc::new(db);

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                enqueue(&db, "q", &format!(r#"{{"n":{i}}}"#)).await
            }));
        }
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "concurrent enqueue failed: {result:?}");
        }

        assert_eq!(row_count(&db).await, 10);
    }
}
