// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Parley crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    Storage,
    VectorStore,
}

// --- Conversation types ---

/// Author of a message in a conversation log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single `{role, content}` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Which flow a conversation thread belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionKind {
    /// Long-running interview dialogue, unbounded turns.
    Interview,
    /// Terminal summarization pass producing a structured artifact.
    Summary,
}

/// Lifecycle state of a conversation thread.
///
/// `Empty` is implicit: it is never persisted, it is what a thread id without
/// any checkpoint means.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Empty,
    Active,
    Terminal,
}

/// A durable, resumable snapshot of a thread's conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique identifier of this snapshot.
    pub id: String,
    /// Thread the snapshot belongs to.
    pub thread_id: String,
    /// Snapshot this one was derived from, if any.
    pub parent_id: Option<String>,
    /// Monotonic position within the thread, starting at 1.
    pub step: i64,
    pub kind: SessionKind,
    pub state: SessionState,
    /// Full ordered message log as of this snapshot.
    pub messages: Vec<ChatMessage>,
    pub created_at: String,
}

/// Summary row for a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub user_id: String,
    pub kind: SessionKind,
    pub state: SessionState,
    pub created_at: String,
    pub updated_at: String,
}

// --- Memory job types ---

/// Identifier assigned to a job by the queue.
pub type JobId = i64;

/// Content submitted for memorization: a text blob or an ordered message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryPayload {
    Text(String),
    Messages(Vec<ChatMessage>),
}

impl MemoryPayload {
    /// Texts that become individual memory records.
    ///
    /// A text blob yields itself; a message list yields each non-empty user or
    /// assistant entry. Blank entries and system messages are dropped.
    pub fn texts(&self) -> Vec<String> {
        match self {
            MemoryPayload::Text(text) => {
                if text.trim().is_empty() {
                    vec![]
                } else {
                    vec![text.clone()]
                }
            }
            MemoryPayload::Messages(messages) => messages
                .iter()
                .filter(|m| m.role != Role::System && !m.content.trim().is_empty())
                .map(|m| m.content.clone())
                .collect(),
        }
    }
}

impl From<String> for MemoryPayload {
    fn from(text: String) -> Self {
        MemoryPayload::Text(text)
    }
}

impl From<&str> for MemoryPayload {
    fn from(text: &str) -> Self {
        MemoryPayload::Text(text.to_string())
    }
}

impl From<Vec<ChatMessage>> for MemoryPayload {
    fn from(messages: Vec<ChatMessage>) -> Self {
        MemoryPayload::Messages(messages)
    }
}

/// A deferred memory write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryJob {
    pub user_id: String,
    pub payload: MemoryPayload,
    pub enqueued_at: String,
    /// Number of failed attempts before the current delivery.
    #[serde(default)]
    pub attempt: u32,
}

impl MemoryJob {
    pub fn new(user_id: impl Into<String>, payload: impl Into<MemoryPayload>) -> Self {
        Self {
            user_id: user_id.into(),
            payload: payload.into(),
            enqueued_at: crate::time::now_timestamp(),
            attempt: 0,
        }
    }
}

/// Lifecycle status of a queue row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A raw row of the durable job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: JobId,
    pub queue_name: String,
    pub payload: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: String,
    pub updated_at: String,
    pub available_at: String,
    pub locked_until: Option<String>,
    pub last_error: Option<String>,
}

/// A job handed to a worker, decoded from its queue row.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedJob {
    pub id: JobId,
    pub job: MemoryJob,
}

/// What a claim handed out.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// A decoded job, locked for the caller.
    Job(ClaimedJob),
    /// An entry whose payload could not be decoded. It is already in the
    /// failed set; the caller only reports it.
    Dead {
        id: JobId,
        attempts: u32,
        error: String,
    },
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOutcome {
    /// Job was rescheduled and becomes available again at `retry_at`.
    Retrying { attempts: u32, retry_at: String },
    /// Attempt budget exhausted; job moved to the failed set.
    Exhausted { attempts: u32 },
}

/// Number of queue rows per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

// --- Memory record types ---

/// Category tag stored on every memory record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemoryCategory {
    #[default]
    Memory,
}

/// A single stored memory fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: String,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: String,
    pub category: MemoryCategory,
}

/// A memory returned by relevance search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMemory {
    pub id: String,
    pub text: String,
    pub created_at: String,
    /// Cosine similarity to the query, higher is more relevant.
    pub score: f32,
}

/// Parameters of a filtered similarity search.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub collection: String,
    pub vector: Vec<f32>,
    /// Only points whose `userId` payload equals this value are considered.
    pub user_id: String,
    pub limit: usize,
    pub score_threshold: Option<f32>,
}

/// Schema of a payload index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayloadSchema {
    Keyword,
}

// --- Provider types ---

/// Shape the model is asked to produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free text.
    #[default]
    Text,
    /// JSON conforming to the given JSON Schema.
    Json { schema: serde_json::Value },
}

/// A request to an LLM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A response from an LLM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}
