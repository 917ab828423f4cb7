// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for the Parley interviewer.
//!
//! ## Architecture
//!
//! - **MemoryClient**: enqueues memory jobs without waiting for them
//! - **WorkerPool**: claims jobs with bounded concurrency and reports outcomes
//! - **MemoryIngestor**: ensures the user's collection, embeds, upserts
//! - **CollectionManager**: lazy, idempotent per-user collection + index setup
//! - **MemoryRetriever**: cosine relevance search and full listing
//! - **SqliteVectorStore**: vector collections stored in the shared database

pub mod client;
pub mod collection;
pub mod ingest;
pub mod retriever;
pub mod store;
pub mod vector;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use client::MemoryClient;
pub use collection::CollectionManager;
pub use ingest::MemoryIngestor;
pub use retriever::MemoryRetriever;
pub use store::SqliteVectorStore;
pub use worker::{WorkerPool, WorkerSettings};
