// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete memory and conversation stack on a
//! temp SQLite database with mock model and embedding adapters. Workers are
//! not started; tests drain the queue explicitly with `process_memories()`
//! or run a pool themselves.

use std::sync::Arc;

use tempfile::TempDir;

use parley_agent::{ConversationManager, ModelSettings, StructuredSummary, SummaryManager};
use parley_bus::EventBus;
use parley_config::model::{ParleyConfig, QueueConfig, StorageConfig};
use parley_core::types::{ChatMessage, JobId, MemoryPayload};
use parley_core::{ParleyError, StorageAdapter};
use parley_memory::{
    CollectionManager, MemoryClient, MemoryIngestor, MemoryRetriever, SqliteVectorStore,
    WorkerPool, WorkerSettings,
};
use parley_storage::SqliteStorage;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

const DIMENSIONS: usize = 32;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    max_attempts: u32,
    similarity_threshold: f32,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            max_attempts: 3,
            similarity_threshold: 0.0,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Set the attempt budget of memory jobs.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the minimum similarity of search results.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir = TempDir::new().map_err(|e| ParleyError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = ParleyConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                wal_mode: true,
            },
            queue: QueueConfig {
                max_attempts: self.max_attempts,
                backoff_base_ms: 0,
                enqueue_delay_ms: 0,
                poll_interval_ms: 10,
                ..QueueConfig::default()
            },
            ..ParleyConfig::default()
        };
        config.memory.embedding_dimensions = DIMENSIONS;
        config.memory.similarity_threshold = self.similarity_threshold;
        config.worker.concurrency = 2;

        TestHarness::assemble(
            config,
            Arc::new(MockProvider::with_responses(self.responses)),
            Arc::new(MockEmbedder::new(DIMENSIONS)),
            Arc::new(temp_dir),
        )
        .await
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The mock LLM provider.
    pub mock_provider: Arc<MockProvider>,
    /// The deterministic embedder.
    pub embedder: Arc<MockEmbedder>,
    /// SQLite storage: queue, threads and checkpoints.
    pub storage: Arc<SqliteStorage>,
    /// Vector store sharing the storage database.
    pub vectors: Arc<SqliteVectorStore>,
    pub bus: EventBus,
    pub collections: Arc<CollectionManager>,
    pub ingestor: Arc<MemoryIngestor>,
    pub memory: MemoryClient,
    pub retriever: Arc<MemoryRetriever>,
    pub conversation: ConversationManager,
    pub summaries: SummaryManager,
    pub workers: Arc<WorkerPool>,
    pub config: ParleyConfig,
    /// Temp directory kept alive for cleanup on drop.
    temp_dir: Arc<TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    async fn assemble(
        config: ParleyConfig,
        mock_provider: Arc<MockProvider>,
        embedder: Arc<MockEmbedder>,
        temp_dir: Arc<TempDir>,
    ) -> Result<Self, ParleyError> {
        let storage = Arc::new(SqliteStorage::new(
            config.storage.clone(),
            config.queue.clone(),
        ));
        storage.initialize().await?;
        let vectors = Arc::new(SqliteVectorStore::new(storage.database()?));

        let bus = EventBus::default();
        let collections = Arc::new(CollectionManager::new(
            vectors.clone(),
            config.memory.collection_prefix.clone(),
            config.memory.embedding_dimensions,
        ));
        let retriever = Arc::new(MemoryRetriever::new(
            collections.clone(),
            embedder.clone(),
            &config.memory,
        ));
        let memory = MemoryClient::new(storage.clone(), bus.clone());
        let ingestor = Arc::new(MemoryIngestor::new(collections.clone(), embedder.clone()));
        let workers = Arc::new(WorkerPool::new(
            storage.clone(),
            ingestor.clone(),
            bus.clone(),
            WorkerSettings::from_config(&config.queue, &config.worker),
        ));

        let conversation = ConversationManager::new(
            storage.clone(),
            mock_provider.clone(),
            memory.clone(),
            retriever.clone(),
            ModelSettings::interview(&config.agent),
        );
        let summaries = SummaryManager::new(
            storage.clone(),
            mock_provider.clone(),
            retriever.clone(),
            ModelSettings::summary(&config.agent),
        );

        Ok(Self {
            mock_provider,
            embedder,
            storage,
            vectors,
            bus,
            collections,
            ingestor,
            memory,
            retriever,
            conversation,
            summaries,
            workers,
            config,
            temp_dir,
        })
    }

    /// Run one interview turn.
    pub async fn submit_turn(&self, user_id: &str, message: &str) -> Result<String, ParleyError> {
        self.conversation.submit_turn(user_id, message).await
    }

    /// Run the summary pass.
    pub async fn summarize(&self, user_id: &str) -> Result<StructuredSummary, ParleyError> {
        self.summaries.summarize(user_id).await
    }

    /// Enqueue a memory write.
    pub async fn add_memory(
        &self,
        user_id: &str,
        content: impl Into<MemoryPayload>,
    ) -> Result<JobId, ParleyError> {
        self.memory.add_memory(user_id, content).await
    }

    /// The persisted interview log.
    pub async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>, ParleyError> {
        self.conversation.history(user_id).await
    }

    /// Process queued memory jobs until none is available; returns how many
    /// were handled.
    pub async fn process_memories(&self) -> usize {
        self.workers.run_until_idle().await
    }

    /// Close the database and reopen the whole stack on the same file,
    /// keeping the mock adapters and their scripted state.
    pub async fn restart(self) -> Result<TestHarness, ParleyError> {
        self.storage.close().await?;
        Self::assemble(
            self.config,
            self.mock_provider,
            self.embedder,
            self.temp_dir,
        )
        .await
    }
}
