// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock LLM provider with scripted replies and failures
//! - [`MockEmbedder`] - Hashed bag-of-words embedder with failure injection
//! - [`FailingQueue`], [`FailingCheckpointStore`], [`FailingVectorStore`] -
//!   adapters that always return storage errors
//! - [`TestHarness`] - the full stack on a temp database

pub mod failing;
pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use failing::{FailingCheckpointStore, FailingQueue, FailingVectorStore};
pub use harness::TestHarness;
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
