// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal summarization pass over a user's interview.

use std::sync::Arc;

use tracing::{info, warn};

use parley_core::naming::{interview_thread_id, summary_thread_id};
use parley_core::types::{
    ChatMessage, ProviderRequest, ResponseFormat, SessionKind, SessionState,
};
use parley_core::{CheckpointStore, ParleyError, ProviderAdapter};
use parley_memory::MemoryRetriever;

use crate::conversation::{ModelSettings, next_checkpoint, require_user_id};
use crate::prompt;
use crate::schema::StructuredSummary;

/// Produces and records structured interview summaries.
pub struct SummaryManager {
    checkpoints: Arc<dyn CheckpointStore>,
    provider: Arc<dyn ProviderAdapter>,
    retriever: Arc<MemoryRetriever>,
    settings: ModelSettings,
}

impl SummaryManager {
    pub fn new(
        checkpoints: Arc<dyn CheckpointStore>,
        provider: Arc<dyn ProviderAdapter>,
        retriever: Arc<MemoryRetriever>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            checkpoints,
            provider,
            retriever,
            settings,
        }
    }

    /// Summarizes the interview of `user_id` with exactly one model call.
    ///
    /// The validated summary is appended to the `summary-{user_id}` thread as
    /// its terminal message. Calling again appends another one. An empty
    /// interview whose model output fails validation yields
    /// [`StructuredSummary::no_interview`].
    pub async fn summarize(&self, user_id: &str) -> Result<StructuredSummary, ParleyError> {
        require_user_id(user_id)?;

        let conversation = self
            .checkpoints
            .load_latest(&interview_thread_id(user_id))
            .await?
            .map(|c| c.messages)
            .unwrap_or_default();

        let memories = match self.retriever.get_all(user_id).await {
            Ok(memories) => memories,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load memories for summary");
                Vec::new()
            }
        };

        let thread_id = summary_thread_id(user_id);
        let previous = self.checkpoints.load_latest(&thread_id).await?;

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            system_prompt: Some(prompt::summary_prompt(&memories, &conversation)),
            messages: vec![ChatMessage::user(prompt::SUMMARY_REQUEST)],
            max_tokens: self.settings.max_tokens,
            response_format: ResponseFormat::Json {
                schema: StructuredSummary::json_schema()?,
            },
        };
        let response = self.provider.complete(request).await?;

        let summary = match StructuredSummary::parse(&response.content) {
            Ok(summary) => summary,
            Err(e) if conversation.is_empty() => {
                warn!(user_id, error = %e, "empty interview, using canned summary");
                StructuredSummary::no_interview()
            }
            Err(e) => return Err(e),
        };

        let serialized = serde_json::to_string_pretty(&summary)
            .map_err(|e| ParleyError::Internal(format!("failed to serialize summary: {e}")))?;
        let mut messages = previous
            .as_ref()
            .map(|c| c.messages.clone())
            .unwrap_or_default();
        messages.push(ChatMessage::assistant(serialized));

        let checkpoint = next_checkpoint(
            previous.as_ref(),
            &thread_id,
            SessionKind::Summary,
            SessionState::Terminal,
            messages,
        );
        self.checkpoints.put(user_id, &checkpoint).await?;

        info!(
            user_id,
            thread_id = %thread_id,
            step = checkpoint.step,
            score = summary.score,
            rating = %summary.rating,
            memories = memories.len(),
            "summary recorded"
        );
        Ok(summary)
    }
}
