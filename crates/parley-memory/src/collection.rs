// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy per-user collection bootstrap.

use std::sync::Arc;

use tracing::debug;

use parley_core::naming::{USER_ID_FIELD, collection_name};
use parley_core::types::PayloadSchema;
use parley_core::{ParleyError, VectorStoreAdapter};

/// Ensures a user's collection and its `userId` keyword index exist.
///
/// Both creations are attempted on every call. "Already exists" counts as
/// success, so concurrent or repeated calls converge on the same state.
pub struct CollectionManager {
    store: Arc<dyn VectorStoreAdapter>,
    prefix: String,
    dimensions: usize,
}

impl CollectionManager {
    pub fn new(
        store: Arc<dyn VectorStoreAdapter>,
        prefix: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            dimensions,
        }
    }

    /// Collection name for `user_id`.
    pub fn collection_for(&self, user_id: &str) -> String {
        collection_name(&self.prefix, user_id)
    }

    /// Vector dimension new collections are created with.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Underlying vector store.
    pub fn store(&self) -> &Arc<dyn VectorStoreAdapter> {
        &self.store
    }

    /// Creates the user's collection and index if needed and returns the
    /// collection name. Any error other than "already exists" propagates.
    pub async fn ensure(&self, user_id: &str) -> Result<String, ParleyError> {
        let name = self.collection_for(user_id);

        match self.store.create_collection(&name, self.dimensions).await {
            Ok(()) => debug!(user_id, collection = %name, "created memory collection"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e),
        }

        match self
            .store
            .create_payload_index(&name, USER_ID_FIELD, PayloadSchema::Keyword)
            .await
        {
            Ok(()) => debug!(user_id, collection = %name, "created userId index"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e),
        }

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_store;

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let (store, _dir) = open_store().await;
        let manager = CollectionManager::new(store.clone(), "user_memories_", 4);

        let first = manager.ensure("u1").await.unwrap();
        let second = manager.ensure("u1").await.unwrap();
        assert_eq!(first, "user_memories_u1");
        assert_eq!(first, second);
        assert_eq!(
            store.payload_indexes(&first).await.unwrap(),
            vec![(USER_ID_FIELD.to_string(), PayloadSchema::Keyword)]
        );
    }

    #[tokio::test]
    async fn ensure_concurrently_converges() {
        let (store, _dir) = open_store().await;
        let manager = Arc::new(CollectionManager::new(store.clone(), "user_memories_", 4));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.ensure("u1").await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.payload_indexes("user_memories_u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn collections_are_per_user() {
        let (store, _dir) = open_store().await;
        let manager = CollectionManager::new(store.clone(), "mem_", 4);
        manager.ensure("a").await.unwrap();
        manager.ensure("b").await.unwrap();
        assert_eq!(store.collection_dimensions("mem_a").await.unwrap(), Some(4));
        assert_eq!(store.collection_dimensions("mem_b").await.unwrap(), Some(4));
    }
}
