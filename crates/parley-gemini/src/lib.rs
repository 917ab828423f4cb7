// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini adapters for Parley.
//!
//! This crate implements [`ProviderAdapter`](parley_core::ProviderAdapter)
//! over `generateContent` (including JSON-schema constrained output) and
//! [`EmbeddingAdapter`](parley_core::EmbeddingAdapter) over
//! `batchEmbedContents`. Both share one authenticated [`GeminiClient`].

pub mod client;
pub mod embedder;
pub mod provider;
pub mod types;

use std::time::Duration;

use tracing::info;

use parley_config::model::GeminiConfig;
use parley_core::ParleyError;

pub use client::GeminiClient;
pub use embedder::GeminiEmbedder;
pub use provider::GeminiProvider;

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Builds the shared client from configuration.
///
/// # API Key Resolution
/// 1. `gemini.api_key` if set and non-empty
/// 2. `GOOGLE_API_KEY` environment variable
/// 3. Returns error if neither is available
pub fn client_from_config(config: &GeminiConfig) -> Result<GeminiClient, ParleyError> {
    let api_key = resolve_api_key(&config.api_key, std::env::var(API_KEY_ENV).ok())?;
    let client = GeminiClient::new(
        &api_key,
        &config.base_url,
        Duration::from_secs(config.timeout_secs),
    )?;
    info!(base_url = %config.base_url, "Gemini client initialized");
    Ok(client)
}

fn resolve_api_key(
    config_key: &Option<String>,
    env_key: Option<String>,
) -> Result<String, ParleyError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    env_key.filter(|k| !k.is_empty()).ok_or_else(|| {
        ParleyError::Config(
            "Gemini API key not found. Set gemini.api_key in config or GOOGLE_API_KEY environment variable.".into(),
        )
    })
}
