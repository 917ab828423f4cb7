// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley status` command implementation.
//!
//! Reports adapter health, memory queue counts and known conversation
//! threads straight from the database. Needs no API key.

use std::io::IsTerminal;

use serde::Serialize;

use parley_core::types::{AdapterType, HealthStatus, QueueCounts, Thread};
use parley_core::{CheckpointStore, ParleyError, PluginAdapter, QueueAdapter};

use crate::runtime::Runtime;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database: String,
    pub queue: String,
    pub adapters: Vec<AdapterReport>,
    pub jobs: QueueCounts,
    pub threads: Vec<Thread>,
}

/// Identity and health of one adapter.
#[derive(Debug, Serialize)]
pub struct AdapterReport {
    pub name: String,
    pub kind: AdapterType,
    pub version: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Runs an adapter's health check. A failing check counts as unhealthy.
pub async fn check_adapter(adapter: &dyn PluginAdapter) -> AdapterReport {
    let (healthy, detail) = match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => (true, None),
        Ok(HealthStatus::Unhealthy(reason)) => (false, Some(reason)),
        Err(e) => (false, Some(e.to_string())),
    };
    AdapterReport {
        name: adapter.name().to_string(),
        kind: adapter.adapter_type(),
        version: adapter.version().to_string(),
        healthy,
        detail,
    }
}

/// Run the `parley status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(runtime: &Runtime, json: bool, plain: bool) -> Result<(), ParleyError> {
    let mut adapters = Vec::new();
    for adapter in runtime.adapters() {
        adapters.push(check_adapter(adapter.as_ref()).await);
    }

    let status = StatusResponse {
        database: runtime.config.storage.database_path.clone(),
        queue: runtime.config.queue.name.clone(),
        adapters,
        jobs: runtime.storage.counts().await?,
        threads: runtime.storage.list_threads().await?,
    };

    if json {
        let rendered = serde_json::to_string_pretty(&status)
            .map_err(|e| ParleyError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&status, use_color);
    }
    Ok(())
}

fn print_status(status: &StatusResponse, use_color: bool) {
    println!();
    println!("  parley status");
    println!("  {}", "-".repeat(35));
    println!("    Database: {}", status.database);
    println!("    Queue:    {}", status.queue);
    println!("    Jobs:     {}", format_counts(&status.jobs));

    println!();
    println!("    Adapters:");
    for adapter in &status.adapters {
        let line = format_adapter(adapter);
        if use_color {
            use colored::Colorize;
            if adapter.healthy {
                println!("      {}", line.green());
            } else {
                println!("      {}", line.red());
            }
        } else {
            println!("      {line}");
        }
    }

    if use_color && status.jobs.failed > 0 {
        use colored::Colorize;
        println!(
            "              {}",
            format!("{} job(s) exhausted their retries", status.jobs.failed).red()
        );
    }

    println!();
    if status.threads.is_empty() {
        println!("    No conversation threads yet.");
    } else {
        println!("    Threads:");
        for thread in &status.threads {
            println!("      {}", format_thread(thread));
        }
    }
    println!();
}

fn format_counts(counts: &QueueCounts) -> String {
    format!(
        "{} pending, {} processing, {} completed, {} failed",
        counts.pending, counts.processing, counts.completed, counts.failed
    )
}

fn format_adapter(adapter: &AdapterReport) -> String {
    let health = match (&adapter.detail, adapter.healthy) {
        (_, true) => "healthy".to_string(),
        (Some(detail), false) => format!("unhealthy ({detail})"),
        (None, false) => "unhealthy".to_string(),
    };
    format!(
        "{:<14} {:<12} v{:<7} {}",
        adapter.name,
        adapter.kind.to_string(),
        adapter.version,
        health
    )
}

fn format_thread(thread: &Thread) -> String {
    format!(
        "{:<24} {:<9} {:<8} updated {}",
        thread.thread_id,
        thread.kind.to_string(),
        thread.state.to_string(),
        thread.updated_at
    )
}
