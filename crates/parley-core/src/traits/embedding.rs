// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for generating vector embeddings from text.
///
/// Implementations are pure functions of their input: the same text always
/// maps to the same vector.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Number of dimensions of every produced vector.
    fn dimensions(&self) -> usize;

    /// Generates one embedding per input text, in input order.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError>;
}
