// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the worker pool monitors. In-flight memory jobs
//! are drained before storage is closed.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_core::{ParleyError, StorageAdapter};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
/// The signal handler task runs in the background until the token is cancelled.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Stops the worker and closes storage, in that order.
///
/// Cancels `cancel`, waits up to `grace` for the worker task to finish its
/// own drain, then closes `storage`. A worker that overruns `grace` is
/// abandoned with a warning; storage is closed regardless.
pub async fn shutdown(
    cancel: &CancellationToken,
    worker: Option<JoinHandle<()>>,
    grace: Duration,
    storage: &dyn StorageAdapter,
) -> Result<(), ParleyError> {
    cancel.cancel();

    if let Some(handle) = worker {
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(())) => debug!("worker pool stopped"),
            Ok(Err(e)) => warn!(error = %e, "worker pool task ended abnormally"),
            Err(_) => warn!(grace_secs = grace.as_secs(), "worker pool did not stop in time"),
        }
    }

    storage.close().await?;
    info!("storage closed");
    Ok(())
}
