// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation thread rows.

use parley_core::ParleyError;
use parley_core::types::Thread;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::queries::parse_column;

fn thread_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thread> {
    Ok(Thread {
        thread_id: row.get(0)?,
        user_id: row.get(1)?,
        kind: parse_column(row, 2)?,
        state: parse_column(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Insert a thread or refresh its state and `updated_at`.
///
/// Runs on a caller-provided connection so it can share a transaction with
/// the checkpoint write.
pub(crate) fn upsert_thread(conn: &rusqlite::Connection, thread: &Thread) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO threads (thread_id, user_id, kind, state, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(thread_id) DO UPDATE SET
             state = excluded.state,
             updated_at = excluded.updated_at",
        params![
            thread.thread_id,
            thread.user_id,
            thread.kind.to_string(),
            thread.state.to_string(),
            thread.created_at,
            thread.updated_at,
        ],
    )?;
    Ok(())
}

/// Get a thread by ID.
pub async fn get_thread(db: &Database, thread_id: &str) -> Result<Option<Thread>, ParleyError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Thread>, rusqlite::Error> {
            conn.query_row(
                "SELECT thread_id, user_id, kind, state, created_at, updated_at
                 FROM threads WHERE thread_id = ?1",
                params![thread_id],
                thread_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List threads, optionally only those of one user, most recently updated first.
pub async fn list_threads(
    db: &Database,
    user_id: Option<&str>,
) -> Result<Vec<Thread>, ParleyError> {
    let user_id = user_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<Thread>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT thread_id, user_id, kind, state, created_at, updated_at
                 FROM threads
                 WHERE ?1 IS NULL OR user_id = ?1
                 ORDER BY updated_at DESC, thread_id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], thread_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::{SessionKind, SessionState};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn thread(id: &str, user: &str, kind: SessionKind, updated_at: &str) -> Thread {
        Thread {
            thread_id: id.to_string(),
            user_id: user.to_string(),
            kind,
            state: SessionState::Active,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: updated_at.to_string(),
        }
    }

    async fn upsert(db: &Database, t: Thread) {
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> { upsert_thread(conn, &t) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upsert_keeps_created_at_and_updates_state() {
        let (db, _dir) = setup_db().await;

        upsert(
            &db,
            thread("summary-u1", "u1", SessionKind::Summary, "2026-01-01T00:00:00.000Z"),
        )
        .await;
        let mut terminal = thread("summary-u1", "u1", SessionKind::Summary, "2026-01-02T00:00:00.000Z");
        terminal.state = SessionState::Terminal;
        terminal.created_at = "2030-01-01T00:00:00.000Z".to_string();
        upsert(&db, terminal).await;

        let stored = get_thread(&db, "summary-u1").await.unwrap().unwrap();
        assert_eq!(stored.state, SessionState::Terminal);
        assert_eq!(stored.kind, SessionKind::Summary);
        assert_eq!(stored.created_at, "2026-01-01T00:00:00.000Z");
        assert_eq!(stored.updated_at, "2026-01-02T00:00:00.000Z");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_user_and_orders_by_recency() {
        let (db, _dir) = setup_db().await;

        upsert(&db, thread("session-u1", "u1", SessionKind::Interview, "2026-01-01T00:00:01.000Z")).await;
        upsert(&db, thread("summary-u1", "u1", SessionKind::Summary, "2026-01-01T00:00:03.000Z")).await;
        upsert(&db, thread("session-u2", "u2", SessionKind::Interview, "2026-01-01T00:00:02.000Z")).await;

        let all = list_threads(&db, None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|t| t.thread_id.as_str()).collect();
        assert_eq!(ids, vec!["summary-u1", "session-u2", "session-u1"]);

        let u2 = list_threads(&db, Some("u2")).await.unwrap();
        assert_eq!(u2.len(), 1);
        assert_eq!(u2[0].thread_id, "session-u2");

        assert!(get_thread(&db, "session-nobody").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
