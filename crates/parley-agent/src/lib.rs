// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interview and summary flows on top of the Parley memory subsystem.
//!
//! - [`ConversationManager`] runs checkpointed interview turns, feeding each
//!   user message into the memory queue and relevant memories into the prompt
//! - [`SummaryManager`] runs the terminal, schema-constrained summary pass
//! - [`shutdown`] wires signals to cancellation and closes storage last

pub mod conversation;
pub mod prompt;
pub mod schema;
pub mod shutdown;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use conversation::{ConversationManager, ModelSettings};
pub use schema::{Rating, StructuredSummary};
pub use summary::SummaryManager;
