// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a queued memory job into stored, embedded memory points.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use parley_core::time::now_timestamp;
use parley_core::types::{EmbeddingInput, JobId, MemoryCategory, MemoryJob, MemoryRecord};
use parley_core::{EmbeddingAdapter, ParleyError};

use crate::collection::CollectionManager;

/// Deterministic point id for the `index`-th text of job `job_id`.
///
/// Re-delivering a job yields the same ids, so its points are replaced
/// rather than duplicated.
pub fn record_id(job_id: JobId, index: usize) -> String {
    let digest = Sha256::digest(format!("{job_id}:{index}").as_bytes());
    hex::encode(digest)
}

/// Processes one memory job: ensure collection, embed, upsert.
pub struct MemoryIngestor {
    collections: Arc<CollectionManager>,
    embedder: Arc<dyn EmbeddingAdapter>,
}

impl MemoryIngestor {
    pub fn new(collections: Arc<CollectionManager>, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        Self {
            collections,
            embedder,
        }
    }

    /// Ingests a job and returns the number of points written.
    ///
    /// Errors are returned unchanged so the queue can retry the job.
    pub async fn process(&self, job_id: JobId, job: &MemoryJob) -> Result<usize, ParleyError> {
        if job.user_id.trim().is_empty() {
            return Err(ParleyError::validation("memory job has an empty user id"));
        }

        let collection = self.collections.ensure(&job.user_id).await?;

        let texts = job.payload.texts();
        if texts.is_empty() {
            debug!(job_id, user_id = %job.user_id, "memory job has no text, nothing to store");
            return Ok(0);
        }

        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: texts.clone(),
            })
            .await?;
        if output.embeddings.len() != texts.len() {
            return Err(ParleyError::Embedding {
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    output.embeddings.len()
                ),
                source: None,
            });
        }

        let created_at = now_timestamp();
        let records: Vec<MemoryRecord> = texts
            .into_iter()
            .zip(output.embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| MemoryRecord {
                id: record_id(job_id, index),
                user_id: job.user_id.clone(),
                text,
                embedding,
                created_at: created_at.clone(),
                category: MemoryCategory::Memory,
            })
            .collect();

        self.collections
            .store()
            .upsert(&collection, &records)
            .await?;

        debug!(
            job_id,
            user_id = %job.user_id,
            attempt = job.attempt,
            points = records.len(),
            "memory job ingested"
        );
        Ok(records.len())
    }
}
