// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters whose every operation fails with a storage error.

use async_trait::async_trait;

use parley_core::types::{
    Checkpoint, Claim, FailOutcome, JobId, MemoryJob, MemoryRecord, PayloadSchema,
    QueueCounts, ScoredMemory, Thread, VectorQuery,
};
use parley_core::{
    AdapterType, CheckpointStore, HealthStatus, ParleyError, PluginAdapter, QueueAdapter,
    VectorStoreAdapter,
};

fn unavailable(what: &str) -> ParleyError {
    ParleyError::Storage {
        source: format!("{what} unavailable").into(),
    }
}

/// Queue that rejects every call.
pub struct FailingQueue;

#[async_trait]
impl QueueAdapter for FailingQueue {
    async fn enqueue(&self, _job: &MemoryJob) -> Result<JobId, ParleyError> {
        Err(unavailable("queue"))
    }

    async fn claim(&self) -> Result<Option<Claim>, ParleyError> {
        Err(unavailable("queue"))
    }

    async fn complete(&self, _id: JobId) -> Result<(), ParleyError> {
        Err(unavailable("queue"))
    }

    async fn fail(&self, _id: JobId, _error: &str) -> Result<FailOutcome, ParleyError> {
        Err(unavailable("queue"))
    }

    async fn counts(&self) -> Result<QueueCounts, ParleyError> {
        Err(unavailable("queue"))
    }
}

/// Checkpoint store that rejects every call.
pub struct FailingCheckpointStore;

#[async_trait]
impl CheckpointStore for FailingCheckpointStore {
    async fn load_latest(&self, _thread_id: &str) -> Result<Option<Checkpoint>, ParleyError> {
        Err(unavailable("checkpoint store"))
    }

    async fn put(&self, _user_id: &str, _checkpoint: &Checkpoint) -> Result<(), ParleyError> {
        Err(unavailable("checkpoint store"))
    }

    async fn list_threads(&self) -> Result<Vec<Thread>, ParleyError> {
        Err(unavailable("checkpoint store"))
    }
}

/// Vector store that rejects every call.
pub struct FailingVectorStore;

#[async_trait]
impl PluginAdapter for FailingVectorStore {
    fn name(&self) -> &str {
        "failing-vector-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Unhealthy("vector store unavailable".into()))
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl VectorStoreAdapter for FailingVectorStore {
    async fn create_collection(&self, _name: &str, _dimensions: usize) -> Result<(), ParleyError> {
        Err(unavailable("vector store"))
    }

    async fn create_payload_index(
        &self,
        _collection: &str,
        _field: &str,
        _schema: PayloadSchema,
    ) -> Result<(), ParleyError> {
        Err(unavailable("vector store"))
    }

    async fn upsert(
        &self,
        _collection: &str,
        _records: &[MemoryRecord],
    ) -> Result<(), ParleyError> {
        Err(unavailable("vector store"))
    }

    async fn search(&self, _query: VectorQuery) -> Result<Vec<ScoredMemory>, ParleyError> {
        Err(unavailable("vector store"))
    }

    async fn scroll(
        &self,
        _collection: &str,
        _user_id: &str,
    ) -> Result<Vec<MemoryRecord>, ParleyError> {
        Err(unavailable("vector store"))
    }
}
