// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for at-least-once memory job processing.
//!
//! A row is claimable when it is `pending` and its `available_at` has passed,
//! or when it is `processing` and its lock has expired (the worker that held
//! it is presumed dead). Reclaiming an expired lock is what makes delivery
//! at-least-once rather than exactly-once.

use std::time::Duration;

use parley_core::time::{now_timestamp, timestamp_after};
use parley_core::types::{FailOutcome, JobId, JobStatus, QueueCounts, QueueEntry};
use parley_core::ParleyError;
use rusqlite::{OptionalExtension, params};
use tracing::warn;

use crate::database::Database;
use crate::queries::parse_column;

const ENTRY_COLUMNS: &str = "id, queue_name, payload, status, attempts, max_attempts,
     created_at, updated_at, available_at, locked_until, last_error";

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        payload: row.get(2)?,
        status: parse_column(row, 3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        available_at: row.get(8)?,
        locked_until: row.get(9)?,
        last_error: row.get(10)?,
    })
}

/// Retry delay after the `attempt`-th failure: `base * 2^(attempt - 1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exponent)
}

/// Enqueue a new job. Returns the auto-generated queue entry ID.
///
/// The row becomes claimable after `delay`.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    max_attempts: u32,
    delay: Duration,
) -> Result<JobId, ParleyError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    let now = now_timestamp();
    let available_at = timestamp_after(delay);
    db.connection()
        .call(move |conn| -> Result<JobId, rusqlite::Error> {
            conn.execute(
                "INSERT INTO queue (queue_name, payload, max_attempts, created_at, updated_at, available_at)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
                params![queue_name, payload, max_attempts, now, available_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim the next available entry from the named queue.
///
/// Atomically selects the oldest claimable entry and marks it as
/// "processing" with a lock expiring after `lock_timeout`. Returns `None`
/// if nothing is claimable right now.
pub async fn claim(
    db: &Database,
    queue_name: &str,
    lock_timeout: Duration,
) -> Result<Option<QueueEntry>, ParleyError> {
    let queue_name = queue_name.to_string();
    let now = now_timestamp();
    let locked_until = timestamp_after(lock_timeout);
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let candidate = tx
                .query_row(
                    &format!(
                        "SELECT {ENTRY_COLUMNS} FROM queue
                         WHERE queue_name = ?1
                           AND ((status = 'pending' AND available_at <= ?2)
                             OR (status = 'processing' AND locked_until < ?2))
                         ORDER BY available_at ASC, id ASC
                         LIMIT 1"
                    ),
                    params![queue_name, now],
                    entry_from_row,
                )
                .optional()?;

            let Some(entry) = candidate else {
                tx.commit()?;
                return Ok(None);
            };

            if entry.status == JobStatus::Processing {
                warn!(
                    job_id = entry.id,
                    queue = %entry.queue_name,
                    locked_until = ?entry.locked_until,
                    "reclaiming job with expired lock"
                );
            }

            tx.execute(
                "UPDATE queue SET status = 'processing', locked_until = ?1, updated_at = ?2
                 WHERE id = ?3",
                params![locked_until, now, entry.id],
            )?;
            tx.commit()?;

            Ok(Some(QueueEntry {
                status: JobStatus::Processing,
                locked_until: Some(locked_until),
                updated_at: now,
                ..entry
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark an entry as completed and trim the completed history to `keep`.
pub async fn complete(db: &Database, id: JobId, keep: u32) -> Result<(), ParleyError> {
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            let queue_name: String =
                tx.query_row("SELECT queue_name FROM queue WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })?;
            tx.execute(
                "UPDATE queue SET status = 'completed', locked_until = NULL, updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?;
            prune_status(&tx, &queue_name, JobStatus::Completed, keep)?;
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed attempt.
///
/// Increments attempts. Once attempts reach `max_attempts` the entry is
/// moved to "failed" and the failed history is trimmed to `keep`; otherwise
/// it returns to "pending" and becomes claimable after the backoff delay.
pub async fn fail(
    db: &Database,
    id: JobId,
    error: &str,
    backoff_base: Duration,
    keep: u32,
) -> Result<FailOutcome, ParleyError> {
    let error = error.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<FailOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let (queue_name, attempts, max_attempts): (String, u32, u32) = tx.query_row(
                "SELECT queue_name, attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let attempts = attempts + 1;
            let outcome = if attempts >= max_attempts {
                tx.execute(
                    "UPDATE queue SET status = 'failed', attempts = ?1, last_error = ?2,
                     locked_until = NULL, updated_at = ?3
                     WHERE id = ?4",
                    params![attempts, error, now, id],
                )?;
                prune_status(&tx, &queue_name, JobStatus::Failed, keep)?;
                FailOutcome::Exhausted { attempts }
            } else {
                let retry_at = timestamp_after(backoff_delay(backoff_base, attempts));
                tx.execute(
                    "UPDATE queue SET status = 'pending', attempts = ?1, last_error = ?2,
                     locked_until = NULL, available_at = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![attempts, error, retry_at, now, id],
                )?;
                FailOutcome::Retrying { attempts, retry_at }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move an entry straight to "failed" regardless of its remaining attempts.
pub async fn exhaust(db: &Database, id: JobId, error: &str, keep: u32) -> Result<(), ParleyError> {
    let error = error.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            let queue_name: String =
                tx.query_row("SELECT queue_name FROM queue WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })?;
            tx.execute(
                "UPDATE queue SET status = 'failed', attempts = attempts + 1, last_error = ?1,
                 locked_until = NULL, updated_at = ?2
                 WHERE id = ?3",
                params![error, now, id],
            )?;
            prune_status(&tx, &queue_name, JobStatus::Failed, keep)?;
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete all but the `keep` most recently finished entries with `status`.
fn prune_status(
    conn: &rusqlite::Connection,
    queue_name: &str,
    status: JobStatus,
    keep: u32,
) -> rusqlite::Result<usize> {
    let status = status.to_string();
    conn.execute(
        "DELETE FROM queue
         WHERE queue_name = ?1 AND status = ?2
           AND id NOT IN (
               SELECT id FROM queue
               WHERE queue_name = ?1 AND status = ?2
               ORDER BY updated_at DESC, id DESC
               LIMIT ?3
           )",
        params![queue_name, status, keep],
    )
}

/// Fetch a single entry by ID.
pub async fn get(db: &Database, id: JobId) -> Result<Option<QueueEntry>, ParleyError> {
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM queue WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count entries per status in the named queue.
pub async fn counts(db: &Database, queue_name: &str) -> Result<QueueCounts, ParleyError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<QueueCounts, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM queue WHERE queue_name = ?1 GROUP BY status",
            )?;
            let rows = stmt.query_map(params![queue_name], |row| {
                Ok((parse_column::<JobStatus>(row, 0)?, row.get::<_, i64>(1)? as u64))
            })?;

            let mut counts = QueueCounts::default();
            for row in rows {
                let (status, n) = row?;
                match status {
                    JobStatus::Pending => counts.pending = n,
                    JobStatus::Processing => counts.processing = n,
                    JobStatus::Completed => counts.completed = n,
                    JobStatus::Failed => counts.failed = n,
                }
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
