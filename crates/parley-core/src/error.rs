// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Parley.

use thiserror::Error;

/// The primary error type used across all Parley adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Job queue errors that are not plain storage failures.
    #[error("queue error: {message}")]
    Queue { message: String },

    /// LLM provider errors (API failure, malformed response, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding backend errors.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A resource that is created idempotently already exists.
    ///
    /// Callers that "ensure" a resource translate this into success.
    #[error("already exists: {resource}")]
    AlreadyExists { resource: String },

    /// A referenced resource does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Input or output failed validation. Never retried.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ParleyError::Validation {
            message: message.into(),
        }
    }

    /// Returns true for infrastructure errors that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ParleyError::Storage { .. }
                | ParleyError::Queue { .. }
                | ParleyError::Provider { .. }
                | ParleyError::Embedding { .. }
                | ParleyError::Timeout { .. }
        )
    }

    /// Returns true for idempotency conflicts ("resource already exists").
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ParleyError::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let storage = ParleyError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        assert!(storage.is_transient());
        assert!(!ParleyError::validation("bad").is_transient());
        assert!(
            !ParleyError::AlreadyExists {
                resource: "index".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn already_exists_is_detected() {
        let err = ParleyError::AlreadyExists {
            resource: "user_memories_u1/userId".into(),
        };
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "already exists: user_memories_u1/userId");
    }
}
