// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero worker counts and similarity bounds.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::out_of_range(
            "agent.log_level",
            &config.agent.log_level,
            &LOG_LEVELS.join(", "),
        ));
    }

    if config.agent.interview_model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "agent.interview_model must not be empty".to_string(),
        });
    }

    if config.agent.summary_model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "agent.summary_model must not be empty".to_string(),
        });
    }

    if config.agent.max_tokens == 0 {
        errors.push(ConfigError::out_of_range("agent.max_tokens", 0, ">= 1"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.queue.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "queue.name must not be empty".to_string(),
        });
    }

    if config.queue.max_attempts < 1 {
        errors.push(ConfigError::out_of_range(
            "queue.max_attempts",
            config.queue.max_attempts,
            ">= 1",
        ));
    }

    if config.queue.lock_timeout_secs == 0 {
        errors.push(ConfigError::out_of_range(
            "queue.lock_timeout_secs",
            0,
            ">= 1",
        ));
    }

    if config.queue.poll_interval_ms == 0 {
        errors.push(ConfigError::out_of_range(
            "queue.poll_interval_ms",
            0,
            ">= 1",
        ));
    }

    if config.worker.concurrency < 1 {
        errors.push(ConfigError::out_of_range(
            "worker.concurrency",
            config.worker.concurrency,
            ">= 1",
        ));
    }

    if config.memory.embedding_dimensions < 1 {
        errors.push(ConfigError::out_of_range(
            "memory.embedding_dimensions",
            config.memory.embedding_dimensions,
            ">= 1",
        ));
    }

    if config.memory.search_limit < 1 {
        errors.push(ConfigError::out_of_range(
            "memory.search_limit",
            config.memory.search_limit,
            ">= 1",
        ));
    }

    let threshold = config.memory.similarity_threshold;
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        errors.push(ConfigError::out_of_range(
            "memory.similarity_threshold",
            threshold,
            "-1.0 to 1.0",
        ));
    }

    if config.memory.collection_prefix.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "memory.collection_prefix must not be empty".to_string(),
        });
    }

    if !config.gemini.base_url.starts_with("http://")
        && !config.gemini.base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "gemini.base_url `{}` must start with http:// or https://",
                config.gemini.base_url
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
