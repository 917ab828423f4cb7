// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkpoint persistence.
//!
//! Checkpoints are append-only: every persisted turn adds a row with the next
//! step number, and the row with the highest step is the thread's current
//! state. `UNIQUE(thread_id, step)` turns a racing second writer into an
//! error instead of a silent overwrite.

use parley_core::ParleyError;
use parley_core::types::{ChatMessage, Checkpoint, Thread};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::queries::parse_column;
use crate::queries::threads::upsert_thread;

const CHECKPOINT_COLUMNS: &str =
    "id, thread_id, parent_id, step, kind, state, messages, created_at";

fn checkpoint_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Checkpoint> {
    let raw_messages: String = row.get(6)?;
    let messages: Vec<ChatMessage> = serde_json::from_str(&raw_messages)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(Checkpoint {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        parent_id: row.get(2)?,
        step: row.get(3)?,
        kind: parse_column(row, 4)?,
        state: parse_column(row, 5)?,
        messages,
        created_at: row.get(7)?,
    })
}

/// Atomically insert a checkpoint and upsert its owning thread.
///
/// Returns [`ParleyError::AlreadyExists`] if the thread already has a
/// checkpoint at this step; nothing is written in that case.
pub async fn put_checkpoint(
    db: &Database,
    user_id: &str,
    checkpoint: &Checkpoint,
) -> Result<(), ParleyError> {
    let messages = serde_json::to_string(&checkpoint.messages).map_err(|e| {
        ParleyError::Storage {
            source: Box::new(e),
        }
    })?;
    let checkpoint = checkpoint.clone();
    let thread = Thread {
        thread_id: checkpoint.thread_id.clone(),
        user_id: user_id.to_string(),
        kind: checkpoint.kind,
        state: checkpoint.state,
        created_at: checkpoint.created_at.clone(),
        updated_at: checkpoint.created_at.clone(),
    };
    let resource = format!("checkpoint {}@{}", checkpoint.thread_id, checkpoint.step);

    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            upsert_thread(&tx, &thread)?;
            let changed = tx.execute(
                "INSERT INTO checkpoints (id, thread_id, parent_id, step, kind, state, messages, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(thread_id, step) DO NOTHING",
                params![
                    checkpoint.id,
                    checkpoint.thread_id,
                    checkpoint.parent_id,
                    checkpoint.step,
                    checkpoint.kind.to_string(),
                    checkpoint.state.to_string(),
                    messages,
                    checkpoint.created_at,
                ],
            )?;
            if changed == 0 {
                // Dropping the transaction rolls back the thread upsert.
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(ParleyError::AlreadyExists { resource })
    }
}

/// Latest checkpoint of a thread, or `None` if it has none.
pub async fn latest_checkpoint(
    db: &Database,
    thread_id: &str,
) -> Result<Option<Checkpoint>, ParleyError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Checkpoint>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {CHECKPOINT_COLUMNS} FROM checkpoints
                     WHERE thread_id = ?1 ORDER BY step DESC LIMIT 1"
                ),
                params![thread_id],
                checkpoint_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every checkpoint of a thread in step order.
pub async fn list_checkpoints(
    db: &Database,
    thread_id: &str,
) -> Result<Vec<Checkpoint>, ParleyError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Checkpoint>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHECKPOINT_COLUMNS} FROM checkpoints
                 WHERE thread_id = ?1 ORDER BY step ASC"
            ))?;
            let rows = stmt.query_map(params![thread_id], checkpoint_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
