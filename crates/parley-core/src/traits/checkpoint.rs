// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkpoint store trait for resumable conversation state.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{Checkpoint, Thread};

/// Durable store of conversation snapshots keyed by thread id.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns the most recent checkpoint of a thread, or `None` if the thread
    /// has never been persisted.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, ParleyError>;

    /// Atomically persists a new checkpoint and updates the owning thread.
    ///
    /// Fails if a checkpoint with the same `(thread_id, step)` already exists.
    async fn put(&self, user_id: &str, checkpoint: &Checkpoint) -> Result<(), ParleyError>;

    /// Lists every known thread, most recently updated first.
    async fn list_threads(&self) -> Result<Vec<Thread>, ParleyError>;
}
