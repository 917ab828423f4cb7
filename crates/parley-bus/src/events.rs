// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event types published on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle events of memory jobs and the worker pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobEvent {
    Enqueued {
        job_id: i64,
        user_id: String,
    },
    Completed {
        job_id: i64,
        user_id: String,
        /// Number of memory records written.
        records: usize,
    },
    Failed {
        job_id: i64,
        /// Empty when the job payload could not be decoded.
        user_id: String,
        attempts: u32,
        /// False once the attempt budget is exhausted.
        will_retry: bool,
        error: String,
    },
    /// Failure of the worker loop itself rather than of a job.
    WorkerError {
        error: String,
    },
}

/// A published event with its identity and publish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub published_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: JobEvent,
}

impl Envelope {
    pub fn new(event: JobEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            published_at: Utc::now(),
            event,
        }
    }
}
