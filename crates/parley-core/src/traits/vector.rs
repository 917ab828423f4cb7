// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store trait for per-user memory collections.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MemoryRecord, PayloadSchema, ScoredMemory, VectorQuery};

/// A vector database holding named collections of memory points.
///
/// Creation calls are not idempotent at this level: they return
/// [`ParleyError::AlreadyExists`] when the target exists, and callers decide
/// whether that is an error.
#[async_trait]
pub trait VectorStoreAdapter: PluginAdapter {
    /// Creates a collection whose vectors have `dimensions` components.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<(), ParleyError>;

    /// Creates a payload index on `field`.
    ///
    /// Returns [`ParleyError::NotFound`] if the collection does not exist.
    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        schema: PayloadSchema,
    ) -> Result<(), ParleyError>;

    /// Inserts or replaces points by id.
    async fn upsert(&self, collection: &str, records: &[MemoryRecord])
    -> Result<(), ParleyError>;

    /// Returns the closest points to the query vector, best first.
    async fn search(&self, query: VectorQuery) -> Result<Vec<ScoredMemory>, ParleyError>;

    /// Returns every point of a user in the collection, oldest first.
    async fn scroll(&self, collection: &str, user_id: &str)
    -> Result<Vec<MemoryRecord>, ParleyError>;
}
