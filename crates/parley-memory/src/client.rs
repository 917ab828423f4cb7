// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write path for new memories: enqueue and return.

use std::sync::Arc;

use tracing::debug;

use parley_bus::{EventBus, JobEvent};
use parley_core::types::{JobId, MemoryJob, MemoryPayload};
use parley_core::{ParleyError, QueueAdapter};

/// Submits memory facts for asynchronous ingestion.
#[derive(Clone)]
pub struct MemoryClient {
    queue: Arc<dyn QueueAdapter>,
    bus: EventBus,
}

impl MemoryClient {
    pub fn new(queue: Arc<dyn QueueAdapter>, bus: EventBus) -> Self {
        Self { queue, bus }
    }

    /// Enqueues `content` as a memory job for `user_id` and returns its id.
    ///
    /// Returns as soon as the job is durably queued. Queue errors propagate.
    pub async fn add_memory(
        &self,
        user_id: &str,
        content: impl Into<MemoryPayload>,
    ) -> Result<JobId, ParleyError> {
        if user_id.trim().is_empty() {
            return Err(ParleyError::validation("user id must not be empty"));
        }
        let job = MemoryJob::new(user_id, content);
        let job_id = self.queue.enqueue(&job).await?;
        debug!(job_id, user_id, "memory job enqueued");
        self.bus.publish(JobEvent::Enqueued {
            job_id,
            user_id: user_id.to_string(),
        });
        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::model::{QueueConfig, StorageConfig};
    use parley_core::StorageAdapter;
    use parley_core::types::ChatMessage;
    use parley_storage::SqliteStorage;
    use tempfile::TempDir;

    async fn storage() -> (Arc<SqliteStorage>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(
            StorageConfig {
                database_path: dir.path().join("client.db").to_string_lossy().into_owned(),
                wal_mode: true,
            },
            QueueConfig::default(),
        );
        storage.initialize().await.unwrap();
        (Arc::new(storage), dir)
    }

    #[tokio::test]
    async fn add_memory_enqueues_and_publishes() {
        let (storage, _dir) = storage().await;
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let client = MemoryClient::new(storage.clone(), bus);

        let id = client.add_memory("u1", "I studied physics").await.unwrap();
        let messages = vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")];
        let second = client.add_memory("u1", messages).await.unwrap();
        assert!(second > id);

        assert_eq!(storage.counts().await.unwrap().pending, 2);
        let envelope = events.recv().await.unwrap();
        assert_eq!(
            envelope.event,
            JobEvent::Enqueued {
                job_id: id,
                user_id: "u1".into()
            }
        );
    }

    #[tokio::test]
    async fn add_memory_rejects_blank_user() {
        let (storage, _dir) = storage().await;
        let client = MemoryClient::new(storage.clone(), EventBus::default());
        let err = client.add_memory("  ", "text").await.unwrap_err();
        assert!(matches!(err, ParleyError::Validation { .. }));
        assert_eq!(storage.counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn add_memory_propagates_queue_errors() {
        let (storage, _dir) = storage().await;
        storage.close().await.unwrap();
        let client = MemoryClient::new(storage, EventBus::default());
        assert!(client.add_memory("u1", "text").await.is_err());
    }
}
