// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley interview memory subsystem.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Parley workspace. Storage, vector store,
//! model and embedding adapters all implement traits defined here.

pub mod error;
pub mod naming;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use types::{
    AdapterType, ChatMessage, Checkpoint, Claim, ClaimedJob, FailOutcome, HealthStatus, JobId,
    JobStatus, MemoryCategory, MemoryJob, MemoryPayload, MemoryRecord, QueueCounts, Role,
    ScoredMemory, SessionKind, SessionState, Thread,
};

pub use traits::{
    CheckpointStore, EmbeddingAdapter, PluginAdapter, ProviderAdapter, QueueAdapter,
    StorageAdapter, VectorStoreAdapter,
};
