// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Parley.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Interviewer identity and model selection.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Memory job queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Memory ingestion worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Memory store and retrieval settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Interviewer identity and model configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the interviewer.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Model used for interview turns.
    #[serde(default = "default_interview_model")]
    pub interview_model: String,

    /// Model used for the structured summary pass.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            interview_model: default_interview_model(),
            summary_model: default_summary_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_agent_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interview_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_summary_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Durable memory job queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Name of the queue memory jobs are written to.
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Attempts per job before it is moved to the failed set.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay of the exponential retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Delay before a freshly enqueued job becomes claimable, in milliseconds.
    #[serde(default = "default_enqueue_delay_ms")]
    pub enqueue_delay_ms: u64,

    /// How long a claimed job stays locked before it may be reclaimed.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Number of completed jobs retained for inspection.
    #[serde(default = "default_keep_completed")]
    pub keep_completed: u32,

    /// Number of failed jobs retained for inspection.
    #[serde(default = "default_keep_failed")]
    pub keep_failed: u32,

    /// How often idle workers poll for new jobs, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            enqueue_delay_ms: default_enqueue_delay_ms(),
            lock_timeout_secs: default_lock_timeout_secs(),
            keep_completed: default_keep_completed(),
            keep_failed: default_keep_failed(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_queue_name() -> String {
    "memory-processing".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_enqueue_delay_ms() -> u64 {
    100
}

fn default_lock_timeout_secs() -> u64 {
    300
}

fn default_keep_completed() -> u32 {
    100
}

fn default_keep_failed() -> u32 {
    50
}

fn default_poll_interval_ms() -> u64 {
    250
}

/// Memory ingestion worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Maximum number of jobs processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upper bound on how long shutdown waits for in-flight jobs.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// Memory store and retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Dimension of every stored embedding vector.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Maximum number of memories returned by relevance search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Minimum cosine similarity for a memory to be returned (-1.0 to 1.0).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Prefix of per-user collection names.
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            embedding_dimensions: default_embedding_dimensions(),
            search_limit: default_search_limit(),
            similarity_threshold: default_similarity_threshold(),
            collection_prefix: default_collection_prefix(),
        }
    }
}

fn default_embedding_dimensions() -> usize {
    768
}

fn default_search_limit() -> usize {
    10
}

fn default_similarity_threshold() -> f32 {
    0.0
}

fn default_collection_prefix() -> String {
    "user_memories_".to_string()
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Gemini API key. `None` falls back to the `GOOGLE_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the Generative Language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used to embed memory texts and queries.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_embedding_model() -> String {
    "gemini-embedding-001".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}
