// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat completions via `models/{model}:generateContent`.

use async_trait::async_trait;
use tracing::debug;

use parley_core::types::{
    ProviderRequest, ProviderResponse, ResponseFormat, Role, TokenUsage,
};
use parley_core::{AdapterType, HealthStatus, ParleyError, PluginAdapter, ProviderAdapter};

use crate::client::{ErrorKind, GeminiClient};
use crate::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};

/// Gemini chat model implementing [`ProviderAdapter`].
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn with_client(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Converts a [`ProviderRequest`] to a `generateContent` body.
    ///
    /// System-role messages are folded into the system instruction after the
    /// request's own system prompt. Assistant turns use Gemini's `model` role.
    pub fn to_generate_request(
        request: &ProviderRequest,
    ) -> Result<GenerateContentRequest, ParleyError> {
        let mut system_parts: Vec<&str> = request.system_prompt.as_deref().into_iter().collect();
        let mut contents = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            match message.role {
                Role::System => system_parts.push(&message.content),
                Role::User => contents.push(Content::text(Some("user"), &message.content)),
                Role::Assistant => contents.push(Content::text(Some("model"), &message.content)),
            }
        }
        if contents.is_empty() {
            return Err(ParleyError::validation(
                "model request needs at least one user or assistant message",
            ));
        }

        let system_instruction = (!system_parts.is_empty())
            .then(|| Content::text(None, system_parts.join("\n\n")));

        let mut generation_config = GenerationConfig {
            max_output_tokens: request.max_tokens,
            ..GenerationConfig::default()
        };
        if let ResponseFormat::Json { schema } = &request.response_format {
            generation_config.response_mime_type = Some("application/json".to_string());
            generation_config.response_json_schema = Some(schema.clone());
        }

        Ok(GenerateContentRequest {
            contents,
            system_instruction,
            generation_config,
        })
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        // Avoid spending tokens on health checks.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        let body = Self::to_generate_request(&request)?;
        let url = self.client.model_url(&request.model, "generateContent");
        let response: GenerateContentResponse =
            self.client.post(&url, &body, ErrorKind::Provider).await?;

        let Some(content) = response.text() else {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .or_else(|| {
                    response
                        .candidates
                        .first()
                        .and_then(|c| c.finish_reason.clone())
                })
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ParleyError::Provider {
                message: format!("Gemini returned no text ({reason})"),
                source: None,
            });
        };

        let usage = response.usage_metadata.as_ref().map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        });
        debug!(
            model = %request.model,
            output_tokens = usage.map(|u| u.output_tokens).unwrap_or_default(),
            "Gemini completion received"
        );

        Ok(ProviderResponse {
            content,
            model: response.model_version.unwrap_or(request.model),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::ChatMessage;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(format: ResponseFormat) -> ProviderRequest {
        ProviderRequest {
            model: "gemini-2.5-pro".into(),
            system_prompt: Some("You are an interviewer.".into()),
            messages: vec![
                ChatMessage::user("Hi, I'm Ana"),
                ChatMessage::assistant("Welcome, Ana."),
                ChatMessage::new(Role::System, "Memory: likes Rust"),
                ChatMessage::user("Ask me something"),
            ],
            max_tokens: 256,
            response_format: format,
        }
    }

    fn provider(server: &MockServer) -> GeminiProvider {
        let client = GeminiClient::new("k", &server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        GeminiProvider::with_client(client)
    }

    #[test]
    fn roles_map_to_gemini_roles() {
        let body = GeminiProvider::to_generate_request(&request(ResponseFormat::Text)).unwrap();
        let roles: Vec<&str> = body
            .contents
            .iter()
            .map(|c| c.role.as_deref().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        let system = body.system_instruction.unwrap().parts[0].text.clone().unwrap();
        assert_eq!(system, "You are an interviewer.\n\nMemory: likes Rust");
        assert!(body.generation_config.response_mime_type.is_none());
    }

    #[test]
    fn request_without_turns_is_rejected() {
        let mut req = request(ResponseFormat::Text);
        req.messages.clear();
        let err = GeminiProvider::to_generate_request(&req).unwrap_err();
        assert!(matches!(err, ParleyError::Validation { .. }));
    }

    #[tokio::test]
    async fn complete_returns_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Tell me about Rust."}]}}],
                "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 5},
                "modelVersion": "gemini-2.5-pro-001"
            })))
            .mount(&server)
            .await;

        let response = provider(&server)
            .complete(request(ResponseFormat::Text))
            .await
            .unwrap();
        assert_eq!(response.content, "Tell me about Rust.");
        assert_eq!(response.model, "gemini-2.5-pro-001");
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                input_tokens: 40,
                output_tokens: 5
            })
        );
    }

    #[tokio::test]
    async fn json_format_sends_schema() {
        let server = MockServer::start().await;
        let schema = serde_json::json!({"type": "object", "properties": {"score": {"type": "number"}}});
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseJsonSchema": schema.clone()
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "{\"score\": 7}"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server)
            .complete(request(ResponseFormat::Json { schema }))
            .await
            .unwrap();
        assert_eq!(response.content, "{\"score\": 7}");
        assert_eq!(response.model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn blocked_prompt_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(request(ResponseFormat::Text))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Provider { .. }));
        assert!(err.to_string().contains("SAFETY"));
    }
}
