// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage, queue and checkpoint traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use parley_config::model::{QueueConfig, StorageConfig};
use parley_core::types::{
    Checkpoint, Claim, ClaimedJob, FailOutcome, JobId, MemoryJob, QueueCounts, Thread,
};
use parley_core::{
    AdapterType, CheckpointStore, HealthStatus, ParleyError, PluginAdapter, QueueAdapter,
    StorageAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    queue: QueueConfig,
    db: OnceCell<Arc<Database>>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig, queue: QueueConfig) -> Self {
        Self {
            config,
            queue,
            db: OnceCell::new(),
        }
    }

    /// Shared handle to the opened database, for components that keep their
    /// own tables in it (the vector store).
    pub fn database(&self) -> Result<Arc<Database>, ParleyError> {
        self.db().cloned()
    }

    fn db(&self) -> Result<&Arc<Database>, ParleyError> {
        self.db.get().ok_or_else(|| ParleyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Every checkpoint of a thread in step order.
    pub async fn checkpoints(&self, thread_id: &str) -> Result<Vec<Checkpoint>, ParleyError> {
        queries::checkpoints::list_checkpoints(self.db()?, thread_id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ParleyError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(Arc::new(db))
            .map_err(|_| ParleyError::Storage {
                source: "storage already initialized".into(),
            })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ParleyError> {
        self.db()?.close().await
    }
}

#[async_trait]
impl QueueAdapter for SqliteStorage {
    async fn enqueue(&self, job: &MemoryJob) -> Result<JobId, ParleyError> {
        let payload = serde_json::to_string(job).map_err(|e| ParleyError::Queue {
            message: format!("failed to serialize job: {e}"),
        })?;
        queries::queue::enqueue(
            self.db()?,
            &self.queue.name,
            &payload,
            self.queue.max_attempts,
            Duration::from_millis(self.queue.enqueue_delay_ms),
        )
        .await
    }

    async fn claim(&self) -> Result<Option<Claim>, ParleyError> {
        let Some(entry) = queries::queue::claim(
            self.db()?,
            &self.queue.name,
            Duration::from_secs(self.queue.lock_timeout_secs),
        )
        .await?
        else {
            return Ok(None);
        };

        match serde_json::from_str::<MemoryJob>(&entry.payload) {
            Ok(mut job) => {
                job.attempt = entry.attempts;
                Ok(Some(Claim::Job(ClaimedJob { id: entry.id, job })))
            }
            Err(e) => {
                // An undecodable payload can never succeed, so it skips retries.
                let error = format!("malformed payload: {e}");
                warn!(job_id = entry.id, error = %error, "failing malformed job payload");
                queries::queue::exhaust(self.db()?, entry.id, &error, self.queue.keep_failed)
                    .await?;
                Ok(Some(Claim::Dead {
                    id: entry.id,
                    attempts: entry.attempts + 1,
                    error,
                }))
            }
        }
    }

    async fn complete(&self, id: JobId) -> Result<(), ParleyError> {
        queries::queue::complete(self.db()?, id, self.queue.keep_completed).await
    }

    async fn fail(&self, id: JobId, error: &str) -> Result<FailOutcome, ParleyError> {
        queries::queue::fail(
            self.db()?,
            id,
            error,
            Duration::from_millis(self.queue.backoff_base_ms),
            self.queue.keep_failed,
        )
        .await
    }

    async fn counts(&self) -> Result<QueueCounts, ParleyError> {
        queries::queue::counts(self.db()?, &self.queue.name).await
    }
}

#[async_trait]
impl CheckpointStore for SqliteStorage {
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, ParleyError> {
        queries::checkpoints::latest_checkpoint(self.db()?, thread_id).await
    }

    async fn put(&self, user_id: &str, checkpoint: &Checkpoint) -> Result<(), ParleyError> {
        queries::checkpoints::put_checkpoint(self.db()?, user_id, checkpoint).await
    }

    async fn list_threads(&self) -> Result<Vec<Thread>, ParleyError> {
        queries::threads::list_threads(self.db()?, None).await
    }
}
