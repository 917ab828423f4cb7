// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Parley memory subsystem.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod checkpoint;
pub mod embedding;
pub mod provider;
pub mod queue;
pub mod storage;
pub mod vector;

pub use adapter::PluginAdapter;
pub use checkpoint::CheckpointStore;
pub use embedding::EmbeddingAdapter;
pub use provider::ProviderAdapter;
pub use queue::QueueAdapter;
pub use storage::StorageAdapter;
pub use vector::VectorStoreAdapter;
