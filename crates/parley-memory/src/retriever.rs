// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory retrieval: relevance search for turns, full listing for summaries.
//!
//! Search embeds the query, runs a cosine similarity search restricted to the
//! user's collection and `userId`, and returns the best matches first.
//! Retrieval is advisory: search failures are logged and degrade to an empty
//! result instead of failing the turn.

use std::sync::Arc;

use tracing::{debug, warn};

use parley_config::model::MemoryConfig;
use parley_core::types::{EmbeddingInput, MemoryRecord, ScoredMemory, VectorQuery};
use parley_core::{EmbeddingAdapter, ParleyError};

use crate::collection::CollectionManager;

/// Reads memories back out of a user's collection.
pub struct MemoryRetriever {
    collections: Arc<CollectionManager>,
    embedder: Arc<dyn EmbeddingAdapter>,
    limit: usize,
    threshold: f32,
}

impl MemoryRetriever {
    pub fn new(
        collections: Arc<CollectionManager>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: &MemoryConfig,
    ) -> Self {
        Self {
            collections,
            embedder,
            limit: config.search_limit,
            threshold: config.similarity_threshold,
        }
    }

    /// Most relevant memories for `query`, best first.
    ///
    /// Never fails: any embedding or store error yields an empty list.
    pub async fn search(&self, user_id: &str, query: &str) -> Vec<ScoredMemory> {
        match self.try_search(user_id, query).await {
            Ok(results) => {
                debug!(user_id, results = results.len(), "memory search completed");
                results
            }
            Err(e) => {
                warn!(user_id, error = %e, "memory search failed, continuing without memories");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, user_id: &str, query: &str) -> Result<Vec<ScoredMemory>, ParleyError> {
        let collection = self.collections.ensure(user_id).await?;
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![query.to_string()],
            })
            .await?;
        let vector = output.embeddings.into_iter().next().ok_or_else(|| {
            ParleyError::Embedding {
                message: "embedding returned no results".to_string(),
                source: None,
            }
        })?;

        self.collections
            .store()
            .search(VectorQuery {
                collection,
                vector,
                user_id: user_id.to_string(),
                limit: self.limit,
                score_threshold: Some(self.threshold),
            })
            .await
    }

    /// Every memory of the user, oldest first.
    pub async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryRecord>, ParleyError> {
        let collection = self.collections.ensure(user_id).await?;
        self.collections.store().scroll(&collection, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::MemoryIngestor;
    use crate::test_support::{FailingEmbedder, HashEmbedder, open_store};
    use parley_core::types::MemoryJob;
    use tracing_test::traced_test;

    fn config(limit: usize, threshold: f32) -> MemoryConfig {
        MemoryConfig {
            search_limit: limit,
            similarity_threshold: threshold,
            embedding_dimensions: 32,
            ..MemoryConfig::default()
        }
    }

    #[tokio::test]
    async fn search_returns_relevant_memory_first() {
        let (store, _dir) = open_store().await;
        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(HashEmbedder::new(32));
        let collections = Arc::new(CollectionManager::new(store, "user_memories_", 32));
        let ingestor = MemoryIngestor::new(collections.clone(), embedder.clone());
        ingestor
            .process(1, &MemoryJob::new("u1", "I have five years of Rust experience"))
            .await
            .unwrap();
        ingestor
            .process(2, &MemoryJob::new("u1", "My favourite food is pasta"))
            .await
            .unwrap();

        let retriever = MemoryRetriever::new(collections, embedder, &config(10, 0.0));
        let results = retriever.search("u1", "How much Rust experience?").await;
        assert!(!results.is_empty());
        assert!(results[0].text.contains("Rust"));
    }

    #[tokio::test]
    async fn search_for_new_user_is_empty_and_creates_collection() {
        let (store, _dir) = open_store().await;
        let collections = Arc::new(CollectionManager::new(store.clone(), "user_memories_", 32));
        let retriever =
            MemoryRetriever::new(collections, Arc::new(HashEmbedder::new(32)), &config(10, 0.0));

        assert!(retriever.search("fresh", "anything").await.is_empty());
        assert_eq!(
            store.collection_dimensions("user_memories_fresh").await.unwrap(),
            Some(32)
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn search_swallows_embedding_errors() {
        let (store, _dir) = open_store().await;
        let collections = Arc::new(CollectionManager::new(store, "user_memories_", 8));
        let retriever = MemoryRetriever::new(collections, Arc::new(FailingEmbedder), &config(10, 0.0));
        assert!(retriever.search("u1", "hello").await.is_empty());
        assert!(logs_contain("memory search failed"));
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let (store, _dir) = open_store().await;
        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(HashEmbedder::new(32));
        let collections = Arc::new(CollectionManager::new(store, "user_memories_", 32));
        let ingestor = MemoryIngestor::new(collections.clone(), embedder.clone());
        for id in 0..5 {
            ingestor
                .process(id, &MemoryJob::new("u1", format!("rust fact {id}")))
                .await
                .unwrap();
        }

        let retriever = MemoryRetriever::new(collections, embedder, &config(2, -1.0));
        assert_eq!(retriever.search("u1", "rust").await.len(), 2);
    }

    #[tokio::test]
    async fn get_all_lists_user_memories_only() {
        let (store, _dir) = open_store().await;
        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(HashEmbedder::new(8));
        let collections = Arc::new(CollectionManager::new(store, "user_memories_", 8));
        let ingestor = MemoryIngestor::new(collections.clone(), embedder.clone());
        ingestor.process(1, &MemoryJob::new("u1", "first")).await.unwrap();
        ingestor.process(2, &MemoryJob::new("u2", "other user")).await.unwrap();
        ingestor.process(3, &MemoryJob::new("u1", "second")).await.unwrap();

        let retriever = MemoryRetriever::new(collections, embedder, &config(10, 0.0));
        let all = retriever.get_all("u1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.user_id == "u1"));
    }
}
