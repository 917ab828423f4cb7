// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley chat` command implementation.
//!
//! Interactive REPL with colored prompt and readline history. Every line is
//! one interview turn on the user's persisted session, so quitting and
//! starting again continues the same conversation.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use parley_agent::ConversationManager;
use parley_core::ParleyError;

/// Runs the REPL until `/quit`, Ctrl+C or Ctrl+D.
pub async fn run_chat(conversation: &ConversationManager, user_id: &str) -> Result<(), ParleyError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| ParleyError::Internal(format!("failed to initialize readline: {e}")))?;

    let history = conversation.history(user_id).await?;
    println!("{}", "parley chat".bold().green());
    if history.is_empty() {
        println!("New interview for {}.", user_id.cyan());
    } else {
        println!(
            "Resuming interview for {} ({} messages so far).",
            user_id.cyan(),
            history.len()
        );
    }
    println!("Type {} to exit.\n", "/quit".yellow());

    let prompt = format!("{}> ", user_id.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if is_quit(trimmed) {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match conversation.submit_turn(user_id, trimmed).await {
                    Ok(reply) => println!("\n{}\n", reply),
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    debug!(user_id, "chat session ended");
    println!("{}", "goodbye".dimmed());
    Ok(())
}

fn is_quit(line: &str) -> bool {
    line == "/quit" || line == "/exit"
}
