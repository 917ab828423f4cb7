// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - an interview agent that remembers.
//!
//! This is the binary entry point. Every command loads and validates the
//! configuration, opens storage once and closes it before exiting.

mod runtime;
mod shell;
mod status;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use parley_agent::shutdown::install_signal_handler;
use parley_core::ParleyError;

use crate::runtime::Runtime;

/// Parley - an interview agent that remembers.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one interview turn and print the reply.
    Ask {
        #[arg(long)]
        user: String,
        message: String,
    },
    /// Interactive interview session.
    Chat {
        #[arg(long)]
        user: String,
    },
    /// Queue a fact about the user for memorization.
    Remember {
        #[arg(long)]
        user: String,
        text: String,
    },
    /// Produce the structured interview summary.
    Summary {
        #[arg(long)]
        user: String,
    },
    /// Print the interview log.
    History {
        #[arg(long)]
        user: String,
    },
    /// Process memory jobs until interrupted.
    Worker,
    /// Show queue counts and conversation threads.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match parley_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    runtime::init_tracing(&config.agent.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: parley_config::model::ParleyConfig) -> Result<(), ParleyError> {
    let runtime = Runtime::open(config).await?;

    match &command {
        Commands::History { user } => {
            let result = print_history(&runtime, user).await;
            runtime.shutdown(&CancellationToken::new(), None).await?;
            return result;
        }
        Commands::Status { json, plain } => {
            let result = status::run_status(&runtime, *json, *plain).await;
            runtime.shutdown(&CancellationToken::new(), None).await?;
            return result;
        }
        _ => {}
    }

    let services = match runtime.services() {
        Ok(services) => services,
        Err(e) => {
            runtime.shutdown(&CancellationToken::new(), None).await?;
            return Err(e);
        }
    };

    let cancel = if matches!(command, Commands::Worker) {
        install_signal_handler()
    } else {
        CancellationToken::new()
    };
    let worker = runtime.start_workers(services.workers.clone(), cancel.clone());

    let result = match command {
        Commands::Ask { user, message } => services
            .conversation
            .submit_turn(&user, &message)
            .await
            .map(|reply| println!("{reply}")),
        Commands::Chat { user } => shell::run_chat(&services.conversation, &user).await,
        Commands::Remember { user, text } => services
            .memory
            .add_memory(&user, text)
            .await
            .map(|job_id| println!("queued memory job {job_id}")),
        Commands::Summary { user } => match services.summaries.summarize(&user).await {
            Ok(summary) => serde_json::to_string_pretty(&summary)
                .map(|json| println!("{json}"))
                .map_err(|e| ParleyError::Internal(format!("failed to render summary: {e}"))),
            Err(e) => Err(e),
        },
        Commands::Worker => {
            info!(
                concurrency = runtime.config.worker.concurrency,
                queue = %runtime.config.queue.name,
                "worker pool running, press Ctrl+C to stop"
            );
            cancel.cancelled().await;
            Ok(())
        }
        Commands::History { .. } | Commands::Status { .. } => Ok(()),
    };

    runtime.shutdown(&cancel, Some(worker)).await?;
    result
}

async fn print_history(runtime: &Runtime, user: &str) -> Result<(), ParleyError> {
    use parley_core::CheckpointStore;
    use parley_core::naming::interview_thread_id;

    let messages = runtime
        .storage
        .load_latest(&interview_thread_id(user))
        .await?
        .map(|c| c.messages)
        .unwrap_or_default();

    if messages.is_empty() {
        println!("No interview recorded for {user}.");
    }
    for message in messages {
        println!("{}: {}", message.role.to_string().bold(), message.content);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = parley_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.agent.name, "parley");
    }

    #[test]
    fn cli_parses_ask() {
        let cli = Cli::try_parse_from(["parley", "ask", "--user", "u1", "Hi there"]).unwrap();
        match cli.command {
            Commands::Ask { user, message } => {
                assert_eq!(user, "u1");
                assert_eq!(message, "Hi there");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_requires_user() {
        assert!(Cli::try_parse_from(["parley", "summary"]).is_err());
    }
}
