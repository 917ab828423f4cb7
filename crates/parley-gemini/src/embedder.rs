// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text embeddings via `models/{model}:batchEmbedContents`.

use async_trait::async_trait;
use tracing::debug;

use parley_core::types::{EmbeddingInput, EmbeddingOutput};
use parley_core::{AdapterType, EmbeddingAdapter, HealthStatus, ParleyError, PluginAdapter};

use crate::client::{ErrorKind, GeminiClient};
use crate::types::{BatchEmbedRequest, BatchEmbedResponse, Content, EmbedContentRequest};

/// Gemini embedding model producing fixed-size vectors.
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn with_client(client: GeminiClient, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini-embedding"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
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
impl EmbeddingAdapter for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: Vec::new(),
                dimensions: self.dimensions,
            });
        }

        let qualified = format!("models/{}", self.model);
        let body = BatchEmbedRequest {
            requests: input
                .texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: qualified.clone(),
                    content: Content::text(None, text),
                    output_dimensionality: Some(self.dimensions),
                })
                .collect(),
        };

        let url = self.client.model_url(&self.model, "batchEmbedContents");
        let response: BatchEmbedResponse =
            self.client.post(&url, &body, ErrorKind::Embedding).await?;

        if response.embeddings.len() != input.texts.len() {
            return Err(ParleyError::Embedding {
                message: format!(
                    "requested {} embeddings, received {}",
                    input.texts.len(),
                    response.embeddings.len()
                ),
                source: None,
            });
        }
        if let Some(bad) = response
            .embeddings
            .iter()
            .find(|e| e.values.len() != self.dimensions)
        {
            return Err(ParleyError::Embedding {
                message: format!(
                    "embedding has {} dimensions, expected {}",
                    bad.values.len(),
                    self.dimensions
                ),
                source: None,
            });
        }

        debug!(model = %self.model, count = input.texts.len(), "texts embedded");
        Ok(EmbeddingOutput {
            embeddings: response.embeddings.into_iter().map(|e| e.values).collect(),
            dimensions: self.dimensions,
        })
    }
}
