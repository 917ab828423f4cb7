// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue trait for deferred memory writes.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{Claim, FailOutcome, JobId, MemoryJob, QueueCounts};

/// A durable, at-least-once job queue.
///
/// `enqueue` returns once the job is committed and never waits for
/// processing. A claimed job stays locked for a bounded time; if the worker
/// neither completes nor fails it before the lock expires, the job is handed
/// out again. Consumers must therefore tolerate duplicate delivery.
#[async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Durably records a job and returns its identifier.
    async fn enqueue(&self, job: &MemoryJob) -> Result<JobId, ParleyError>;

    /// Claims the oldest available job, if any.
    ///
    /// An entry that cannot be decoded is moved to the failed set and
    /// returned as [`Claim::Dead`] so the caller can report it.
    async fn claim(&self) -> Result<Option<Claim>, ParleyError>;

    /// Marks a claimed job as successfully processed.
    async fn complete(&self, id: JobId) -> Result<(), ParleyError>;

    /// Records a failed attempt, rescheduling with backoff or giving up.
    async fn fail(&self, id: JobId, error: &str) -> Result<FailOutcome, ParleyError>;

    /// Returns the number of jobs in each status.
    async fn counts(&self) -> Result<QueueCounts, ParleyError>;
}
