// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkpointed interview conversation.
//!
//! A thread moves `Empty -> Active` on its first persisted turn and stays
//! `Active` for as long as the interview continues. Each turn is one straight
//! sequence:
//!
//! 1. Load the latest checkpoint (or start empty)
//! 2. Append the user message
//! 3. Enqueue the message as a memory job (not awaited beyond the enqueue)
//! 4. Search memories relevant to the message
//! 5. Call the model once with instructions, memory context and the log
//! 6. Append the reply and persist the next checkpoint
//!
//! Nothing is written to the checkpoint store unless the whole turn succeeds.

use std::sync::Arc;

use tracing::{debug, info, warn};

use parley_config::model::AgentConfig;
use parley_core::naming::interview_thread_id;
use parley_core::time::now_timestamp;
use parley_core::types::{
    ChatMessage, Checkpoint, ProviderRequest, ResponseFormat, SessionKind, SessionState,
};
use parley_core::{CheckpointStore, ParleyError, ProviderAdapter};
use parley_memory::{MemoryClient, MemoryRetriever};

use crate::prompt;

/// Model settings of one kind of pass.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub agent_name: String,
    pub model: String,
    pub max_tokens: u32,
}

impl ModelSettings {
    pub fn interview(config: &AgentConfig) -> Self {
        Self {
            agent_name: config.name.clone(),
            model: config.interview_model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    pub fn summary(config: &AgentConfig) -> Self {
        Self {
            agent_name: config.name.clone(),
            model: config.summary_model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

/// Builds the checkpoint that follows `previous` on a thread.
pub(crate) fn next_checkpoint(
    previous: Option<&Checkpoint>,
    thread_id: &str,
    kind: SessionKind,
    state: SessionState,
    messages: Vec<ChatMessage>,
) -> Checkpoint {
    Checkpoint {
        id: uuid::Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        parent_id: previous.map(|p| p.id.clone()),
        step: previous.map_or(1, |p| p.step + 1),
        kind,
        state,
        messages,
        created_at: now_timestamp(),
    }
}

pub(crate) fn require_user_id(user_id: &str) -> Result<(), ParleyError> {
    if user_id.trim().is_empty() {
        return Err(ParleyError::validation("user id must not be empty"));
    }
    Ok(())
}

/// Runs interview turns against persisted conversation state.
pub struct ConversationManager {
    checkpoints: Arc<dyn CheckpointStore>,
    provider: Arc<dyn ProviderAdapter>,
    memory: MemoryClient,
    retriever: Arc<MemoryRetriever>,
    settings: ModelSettings,
}

impl ConversationManager {
    pub fn new(
        checkpoints: Arc<dyn CheckpointStore>,
        provider: Arc<dyn ProviderAdapter>,
        memory: MemoryClient,
        retriever: Arc<MemoryRetriever>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            checkpoints,
            provider,
            memory,
            retriever,
            settings,
        }
    }

    /// Handles one user message and returns the interviewer's reply.
    ///
    /// Turns of one user must not run concurrently; turns of different users
    /// may.
    pub async fn submit_turn(&self, user_id: &str, message: &str) -> Result<String, ParleyError> {
        require_user_id(user_id)?;
        if message.trim().is_empty() {
            return Err(ParleyError::validation("message must not be empty"));
        }

        let thread_id = interview_thread_id(user_id);
        let previous = self.checkpoints.load_latest(&thread_id).await?;
        let mut messages = previous
            .as_ref()
            .map(|c| c.messages.clone())
            .unwrap_or_default();
        messages.push(ChatMessage::user(message));

        // The memory write is independent of the reply.
        if let Err(e) = self
            .memory
            .add_memory(user_id, vec![ChatMessage::user(message)])
            .await
        {
            warn!(user_id, thread_id = %thread_id, error = %e, "failed to enqueue memory job");
        }

        let memories = self.retriever.search(user_id, message).await;
        debug!(
            user_id,
            thread_id = %thread_id,
            memories = memories.len(),
            "memory context retrieved"
        );

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            system_prompt: Some(prompt::interviewer_prompt(
                &self.settings.agent_name,
                &memories,
            )),
            messages: messages.clone(),
            max_tokens: self.settings.max_tokens,
            response_format: ResponseFormat::Text,
        };
        let response = self.provider.complete(request).await?;
        let reply = response.content;
        messages.push(ChatMessage::assistant(reply.clone()));

        let checkpoint = next_checkpoint(
            previous.as_ref(),
            &thread_id,
            SessionKind::Interview,
            SessionState::Active,
            messages,
        );
        self.checkpoints.put(user_id, &checkpoint).await?;

        info!(
            user_id,
            thread_id = %thread_id,
            step = checkpoint.step,
            "interview turn persisted"
        );
        Ok(reply)
    }

    /// The persisted interview log of a user, oldest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>, ParleyError> {
        require_user_id(user_id)?;
        let latest = self
            .checkpoints
            .load_latest(&interview_thread_id(user_id))
            .await?;
        Ok(latest.map(|c| c.messages).unwrap_or_default())
    }
}
