// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the Parley stack from configuration.
//!
//! Storage is opened once and shared by reference; the Gemini adapters are
//! only built for commands that talk to the model, so read-only commands run
//! without an API key.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use parley_agent::shutdown;
use parley_agent::{ConversationManager, ModelSettings, SummaryManager};
use parley_bus::{Envelope, EventBus, JobEvent};
use parley_config::model::ParleyConfig;
use parley_core::{EmbeddingAdapter, ParleyError, PluginAdapter, ProviderAdapter, StorageAdapter};
use parley_gemini::{GeminiEmbedder, GeminiProvider};
use parley_memory::{
    CollectionManager, MemoryClient, MemoryIngestor, MemoryRetriever, SqliteVectorStore,
    WorkerPool, WorkerSettings,
};
use parley_storage::SqliteStorage;

/// Opened storage plus everything that needs no model access.
pub struct Runtime {
    pub config: ParleyConfig,
    pub storage: Arc<SqliteStorage>,
    pub bus: EventBus,
    vectors: Arc<SqliteVectorStore>,
}

/// Model-backed components.
pub struct Services {
    pub memory: MemoryClient,
    pub conversation: ConversationManager,
    pub summaries: SummaryManager,
    pub workers: Arc<WorkerPool>,
}

impl Runtime {
    pub async fn open(config: ParleyConfig) -> Result<Self, ParleyError> {
        let storage = Arc::new(SqliteStorage::new(
            config.storage.clone(),
            config.queue.clone(),
        ));
        storage.initialize().await?;
        let vectors = Arc::new(SqliteVectorStore::new(storage.database()?));
        debug!(path = %config.storage.database_path, "runtime storage opened");

        Ok(Self {
            config,
            storage,
            bus: EventBus::default(),
            vectors,
        })
    }

    /// The adapters `status` health-checks.
    pub fn adapters(&self) -> Vec<Arc<dyn PluginAdapter>> {
        let storage: Arc<dyn PluginAdapter> = self.storage.clone();
        let vectors: Arc<dyn PluginAdapter> = self.vectors.clone();
        vec![storage, vectors]
    }

    /// Builds the Gemini adapters and every component on top of them.
    pub fn services(&self) -> Result<Services, ParleyError> {
        let client = parley_gemini::client_from_config(&self.config.gemini)?;
        let provider: Arc<dyn ProviderAdapter> =
            Arc::new(GeminiProvider::with_client(client.clone()));
        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(GeminiEmbedder::with_client(
            client,
            self.config.gemini.embedding_model.clone(),
            self.config.memory.embedding_dimensions,
        ));

        let collections = Arc::new(CollectionManager::new(
            self.vectors.clone(),
            self.config.memory.collection_prefix.clone(),
            self.config.memory.embedding_dimensions,
        ));
        let retriever = Arc::new(MemoryRetriever::new(
            collections.clone(),
            embedder.clone(),
            &self.config.memory,
        ));
        let memory = MemoryClient::new(self.storage.clone(), self.bus.clone());
        let workers = Arc::new(WorkerPool::new(
            self.storage.clone(),
            Arc::new(MemoryIngestor::new(collections, embedder)),
            self.bus.clone(),
            WorkerSettings::from_config(&self.config.queue, &self.config.worker),
        ));

        Ok(Services {
            conversation: ConversationManager::new(
                self.storage.clone(),
                provider.clone(),
                memory.clone(),
                retriever.clone(),
                ModelSettings::interview(&self.config.agent),
            ),
            summaries: SummaryManager::new(
                self.storage.clone(),
                provider,
                retriever,
                ModelSettings::summary(&self.config.agent),
            ),
            memory,
            workers,
        })
    }

    /// Spawns the worker pool and a task that logs its events.
    ///
    /// The returned handle resolves once the pool has drained and the logger
    /// has written every event the drain produced.
    pub fn start_workers(&self, workers: Arc<WorkerPool>, cancel: CancellationToken) -> JoinHandle<()> {
        let done = CancellationToken::new();
        let logger = spawn_event_logger(self.bus.subscribe(), done.clone());

        tokio::spawn(async move {
            workers.run(cancel).await;
            done.cancel();
            if let Err(e) = logger.await {
                warn!(error = %e, "event logger task failed");
            }
        })
    }

    /// Stops workers (if any) and closes storage.
    pub async fn shutdown(
        &self,
        cancel: &CancellationToken,
        worker: Option<JoinHandle<()>>,
    ) -> Result<(), ParleyError> {
        let grace = Duration::from_secs(self.config.worker.drain_timeout_secs + 1);
        shutdown::shutdown(cancel, worker, grace, self.storage.as_ref()).await
    }
}

/// Logs bus events until `done` fires, then logs whatever is still buffered.
///
/// Resolves to the number of events logged.
fn spawn_event_logger(mut events: Receiver<Envelope>, done: CancellationToken) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut logged = 0;
        loop {
            tokio::select! {
                biased;
                received = events.recv() => match received {
                    Ok(envelope) => {
                        log_event(&envelope.event);
                        logged += 1;
                    }
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "event log lagged"),
                    Err(RecvError::Closed) => return logged,
                },
                _ = done.cancelled() => break,
            }
        }
        loop {
            match events.try_recv() {
                Ok(envelope) => {
                    log_event(&envelope.event);
                    logged += 1;
                }
                Err(TryRecvError::Lagged(n)) => warn!(skipped = n, "event log lagged"),
                Err(_) => return logged,
            }
        }
    })
}

fn log_event(event: &JobEvent) {
    match event {
        JobEvent::Enqueued { job_id, user_id } => {
            debug!(job_id, user_id = %user_id, "memory job event: enqueued");
        }
        JobEvent::Completed {
            job_id,
            user_id,
            records,
        } => debug!(job_id, user_id = %user_id, records, "memory job event: completed"),
        JobEvent::Failed {
            job_id,
            user_id,
            attempts,
            will_retry: true,
            error,
        } => debug!(job_id, user_id = %user_id, attempts, error = %error, "memory job event: retrying"),
        JobEvent::Failed {
            job_id,
            user_id,
            attempts,
            will_retry: false,
            error,
        } => warn!(job_id, user_id = %user_id, attempts, error = %error, "memory job event: failed permanently"),
        JobEvent::WorkerError { error } => warn!(error = %error, "memory job event: worker error"),
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
