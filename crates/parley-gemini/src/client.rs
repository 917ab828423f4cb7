// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Generative Language API.
//!
//! Provides [`GeminiClient`], which handles authentication, JSON request and
//! response handling, and a single retry of transient errors.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use parley_core::ParleyError;

use crate::types::ApiErrorResponse;

/// Which adapter a failure is reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Provider,
    Embedding,
}

impl ErrorKind {
    pub(crate) fn error(
        self,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> ParleyError {
        match self {
            ErrorKind::Provider => ParleyError::Provider { message, source },
            ErrorKind::Embedding => ParleyError::Embedding { message, source },
        }
    }
}

/// Authenticated client shared by the chat provider and the embedder.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl GeminiClient {
    /// Builds a client sending `x-goog-api-key` on every request.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| ParleyError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the pause before a retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// URL of a model method, e.g. `models/gemini-2.5-pro:generateContent`.
    pub fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    /// POSTs `body` as JSON and decodes the JSON response.
    ///
    /// On transient errors (429, 500, 502, 503, 504), retries once.
    pub async fn post<Req, Resp>(
        &self,
        url: &str,
        body: &Req,
        kind: ErrorKind,
    ) -> Result<Resp, ParleyError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying Gemini request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = match self.client.post(url).json(body).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    return Err(ParleyError::Timeout {
                        duration: self.timeout,
                    });
                }
                Err(e) => {
                    return Err(kind.error(format!("HTTP request failed: {e}"), Some(Box::new(e))));
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, url, "Gemini response received");

            if status.is_success() {
                let text = response.text().await.map_err(|e| {
                    kind.error(format!("failed to read response body: {e}"), Some(Box::new(e)))
                })?;
                return serde_json::from_str(&text).map_err(|e| {
                    kind.error(format!("failed to parse API response: {e}"), Some(Box::new(e)))
                });
            }

            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, error = %message, "transient error, will retry");
                last_error = Some(kind.error(message, None));
                continue;
            }

            return Err(kind.error(message, None));
        }

        Err(last_error
            .unwrap_or_else(|| kind.error("Gemini request failed after retries".into(), None)))
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api) => format!(
            "Gemini API error ({} {}): {}",
            api.error.code, api.error.status, api.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
