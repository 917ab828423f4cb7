// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::ParleyError;
use parley_core::traits::adapter::PluginAdapter;
use parley_core::traits::provider::ProviderAdapter;
use parley_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};

enum Scripted {
    Reply(String),
    Fail(String),
}

/// A mock LLM provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Every request is recorded.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(Scripted::Reply).collect(),
            )),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: String) {
        self.responses.lock().await.push_back(Scripted::Reply(text));
    }

    /// Make the very next call fail with a provider error.
    pub async fn fail_next(&self, message: &str) {
        self.responses
            .lock()
            .await
            .push_front(Scripted::Fail(message.to_string()));
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let next = self.responses.lock().await.pop_front();
        match next {
            Some(Scripted::Fail(message)) => Err(ParleyError::Provider {
                message,
                source: None,
            }),
            Some(Scripted::Reply(text)) => Ok(response(text, model)),
            None => Ok(response("mock response".to_string(), model)),
        }
    }
}

fn response(content: String, model: String) -> ProviderResponse {
    ProviderResponse {
        content,
        model,
        usage: Some(TokenUsage {
            input_tokens: 10,
            output_tokens: 20,
        }),
    }
}
