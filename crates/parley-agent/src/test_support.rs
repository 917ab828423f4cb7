// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for this crate's unit tests.

use std::sync::Arc;

use tempfile::TempDir;

use parley_bus::EventBus;
use parley_config::model::{AgentConfig, MemoryConfig, QueueConfig, StorageConfig};
use parley_core::{StorageAdapter, VectorStoreAdapter};
use parley_memory::{
    CollectionManager, MemoryClient, MemoryIngestor, MemoryRetriever, SqliteVectorStore,
    WorkerPool, WorkerSettings,
};
use parley_storage::SqliteStorage;
use parley_test_utils::{MockEmbedder, MockProvider};

use crate::conversation::{ConversationManager, ModelSettings};
use crate::summary::SummaryManager;

const DIMENSIONS: usize = 16;

pub struct Fixture {
    pub storage: Arc<SqliteStorage>,
    pub vectors: Arc<SqliteVectorStore>,
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    pub bus: EventBus,
    _dir: TempDir,
}

impl Fixture {
    pub async fn new(responses: Vec<String>) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(SqliteStorage::new(
            StorageConfig {
                database_path: dir.path().join("agent.db").to_string_lossy().into_owned(),
                wal_mode: true,
            },
            QueueConfig {
                backoff_base_ms: 0,
                enqueue_delay_ms: 0,
                ..QueueConfig::default()
            },
        ));
        storage.initialize().await.unwrap();
        let vectors = Arc::new(SqliteVectorStore::new(storage.database().unwrap()));

        Fixture {
            storage,
            vectors,
            provider: Arc::new(MockProvider::with_responses(responses)),
            embedder: Arc::new(MockEmbedder::new(DIMENSIONS)),
            bus: EventBus::default(),
            _dir: dir,
        }
    }

    pub fn settings(&self) -> ModelSettings {
        ModelSettings::interview(&AgentConfig::default())
    }

    pub fn memory_client(&self) -> MemoryClient {
        MemoryClient::new(self.storage.clone(), self.bus.clone())
    }

    fn collections_on(&self, store: Arc<dyn VectorStoreAdapter>) -> Arc<CollectionManager> {
        Arc::new(CollectionManager::new(store, "user_memories_", DIMENSIONS))
    }

    pub fn retriever_on(&self, store: Arc<dyn VectorStoreAdapter>) -> Arc<MemoryRetriever> {
        Arc::new(MemoryRetriever::new(
            self.collections_on(store),
            self.embedder.clone(),
            &MemoryConfig::default(),
        ))
    }

    pub fn retriever(&self) -> Arc<MemoryRetriever> {
        self.retriever_on(self.vectors.clone())
    }

    pub fn conversation(&self) -> ConversationManager {
        ConversationManager::new(
            self.storage.clone(),
            self.provider.clone(),
            self.memory_client(),
            self.retriever(),
            self.settings(),
        )
    }

    pub fn summaries(&self) -> SummaryManager {
        SummaryManager::new(
            self.storage.clone(),
            self.provider.clone(),
            self.retriever(),
            ModelSettings::summary(&AgentConfig::default()),
        )
    }

    /// Drains the memory queue synchronously.
    pub async fn process_memories(&self) -> usize {
        let ingestor = Arc::new(MemoryIngestor::new(
            self.collections_on(self.vectors.clone()),
            self.embedder.clone(),
        ));
        let pool = WorkerPool::new(
            self.storage.clone(),
            ingestor,
            self.bus.clone(),
            WorkerSettings::from_config(&QueueConfig::default(), &Default::default()),
        );
        pool.run_until_idle().await
    }
}

/// Model output that passes every summary bound.
pub fn valid_summary_json() -> String {
    serde_json::json!({
        "overallPerformance": "Clear answers with solid technical grounding.",
        "title": "Backend Engineer - Technical Interview",
        "score": 7.5,
        "rating": "Very Good",
        "sectionScores": {"behavioral": 7, "technical": 8, "communication": 7.5},
        "strengths": ["Strong Rust knowledge", "Structured answers"],
        "areasOfImprovement": ["More metrics in examples", "Shorter answers"],
        "listeningAdaptability": {
            "answeredExactly": "Answered most questions directly.",
            "adaptability": "Handled follow-up questions calmly."
        },
        "domainSpecificInsight": {
            "depth": "Deep understanding of async runtimes.",
            "industryAwareness": "Aware of current cloud cost trends."
        },
        "communicationSkills": "Clear, well structured and concise.",
        "recommendedPractice": ["Practice STAR-format answers"]
    })
    .to_string()
}
