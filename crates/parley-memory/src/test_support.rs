// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for this crate's unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::sync::Semaphore;

use parley_core::types::{EmbeddingInput, EmbeddingOutput};
use parley_core::{AdapterType, EmbeddingAdapter, HealthStatus, ParleyError, PluginAdapter};
use parley_storage::Database;

use crate::store::SqliteVectorStore;

pub async fn open_database() -> (Arc<Database>, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();
    (Arc::new(db), dir)
}

pub async fn open_store() -> (Arc<SqliteVectorStore>, TempDir) {
    let (db, dir) = open_database().await;
    (Arc::new(SqliteVectorStore::new(db)), dir)
}

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket.
pub struct HashEmbedder {
    dimensions: usize,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dimensions;
            v[bucket] += 1.0;
        }
        v
    }
}

#[async_trait]
impl PluginAdapter for HashEmbedder {
    fn name(&self) -> &str {
        "hash-embedder"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }
    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector(t)).collect(),
            dimensions: self.dimensions,
        })
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait]
impl PluginAdapter for FailingEmbedder {
    fn name(&self) -> &str {
        "failing-embedder"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Unhealthy("always fails".into()))
    }
    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for FailingEmbedder {
    fn dimensions(&self) -> usize {
        8
    }

    async fn embed(&self, _input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError> {
        Err(ParleyError::Embedding {
            message: "embedding backend unavailable".into(),
            source: None,
        })
    }
}

/// Embedder that holds every call until the test releases it, tracking how
/// many calls are held at once.
pub struct GatedEmbedder {
    inner: HashEmbedder,
    gate: Semaphore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimensions),
            gate: Semaphore::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Lets `calls` more held or future calls through.
    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for GatedEmbedder {
    fn name(&self) -> &str {
        "gated-embedder"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }
    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for GatedEmbedder {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let permit = self.gate.acquire().await.map_err(|e| ParleyError::Embedding {
            message: e.to_string(),
            source: None,
        })?;
        permit.forget();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.embed(input).await
    }
}
