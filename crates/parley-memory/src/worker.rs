// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-concurrency worker pool draining the memory job queue.
//!
//! The pool claims jobs while it has free slots, hands each to the
//! [`MemoryIngestor`] on its own task, and reports the outcome back to the
//! queue: `complete` on success, `fail` on error so retry and backoff apply.
//! Every outcome is logged and published on the [`EventBus`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_bus::{EventBus, JobEvent};
use parley_config::model::{QueueConfig, WorkerConfig};
use parley_core::QueueAdapter;
use parley_core::types::{Claim, ClaimedJob, FailOutcome, JobId};

use crate::ingest::MemoryIngestor;

/// Tuning knobs of a [`WorkerPool`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub drain_timeout: Duration,
}

impl WorkerSettings {
    pub fn from_config(queue: &QueueConfig, worker: &WorkerConfig) -> Self {
        Self {
            concurrency: worker.concurrency.max(1),
            poll_interval: Duration::from_millis(queue.poll_interval_ms),
            drain_timeout: Duration::from_secs(worker.drain_timeout_secs),
        }
    }
}

/// Consumes memory jobs until cancelled.
pub struct WorkerPool {
    queue: Arc<dyn QueueAdapter>,
    ingestor: Arc<MemoryIngestor>,
    bus: EventBus,
    settings: WorkerSettings,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn QueueAdapter>,
        ingestor: Arc<MemoryIngestor>,
        bus: EventBus,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            queue,
            ingestor,
            bus,
            settings,
        }
    }

    /// Runs the claim loop until `cancel` fires, then waits up to the drain
    /// timeout for in-flight jobs.
    ///
    /// Jobs still running when the drain timeout elapses are aborted; their
    /// queue locks expire and another worker picks them up.
    pub async fn run(&self, cancel: CancellationToken) {
        let slots = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut tasks = JoinSet::new();
        info!(concurrency = self.settings.concurrency, "memory worker pool started");

        loop {
            while let Some(joined) = tasks.try_join_next() {
                self.reap(joined);
            }

            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if cancel.is_cancelled() {
                break;
            }

            match self.queue.claim().await {
                Ok(Some(Claim::Dead { id, attempts, error })) => {
                    drop(permit);
                    report_dead(&self.bus, id, attempts, error);
                }
                Ok(Some(Claim::Job(claimed))) => {
                    let queue = Arc::clone(&self.queue);
                    let ingestor = Arc::clone(&self.ingestor);
                    let bus = self.bus.clone();
                    tasks.spawn(async move {
                        handle_job(queue.as_ref(), &ingestor, &bus, claimed).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    if !self.idle(&cancel).await {
                        break;
                    }
                }
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "failed to claim memory job");
                    self.bus.publish(JobEvent::WorkerError {
                        error: e.to_string(),
                    });
                    if !self.idle(&cancel).await {
                        break;
                    }
                }
            }
        }

        self.drain(tasks).await;
        info!("memory worker pool stopped");
    }

    /// Claims and processes jobs one at a time until none is available.
    ///
    /// Returns the number of jobs handled, whatever their outcome.
    pub async fn run_until_idle(&self) -> usize {
        let mut handled = 0;
        loop {
            match self.queue.claim().await {
                Ok(Some(Claim::Job(claimed))) => {
                    handle_job(self.queue.as_ref(), &self.ingestor, &self.bus, claimed).await;
                    handled += 1;
                }
                Ok(Some(Claim::Dead { id, attempts, error })) => {
                    report_dead(&self.bus, id, attempts, error);
                    handled += 1;
                }
                Ok(None) => return handled,
                Err(e) => {
                    error!(error = %e, "failed to claim memory job");
                    self.bus.publish(JobEvent::WorkerError {
                        error: e.to_string(),
                    });
                    return handled;
                }
            }
        }
    }

    /// Sleeps one poll interval. Returns false if cancelled meanwhile.
    async fn idle(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settings.poll_interval) => true,
        }
    }

    async fn drain(&self, mut tasks: JoinSet<()>) {
        if tasks.is_empty() {
            return;
        }
        info!(in_flight = tasks.len(), "draining in-flight memory jobs");
        let drained = tokio::time::timeout(self.settings.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                self.reap(joined);
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                timeout_secs = self.settings.drain_timeout.as_secs(),
                "drain timeout reached, aborting remaining jobs"
            );
            tasks.abort_all();
        }
    }

    fn reap(&self, joined: Result<(), tokio::task::JoinError>) {
        if let Err(e) = joined
            && e.is_panic()
        {
            error!(error = %e, "memory job task panicked");
            self.bus.publish(JobEvent::WorkerError {
                error: format!("job task panicked: {e}"),
            });
        }
    }
}

/// Announces an entry the queue failed at claim time. Its owner is unknown.
fn report_dead(bus: &EventBus, id: JobId, attempts: u32, error: String) {
    error!(job_id = id, attempt = attempts, error = %error, "memory job failed permanently");
    bus.publish(JobEvent::Failed {
        job_id: id,
        user_id: String::new(),
        attempts,
        will_retry: false,
        error,
    });
}

/// Processes one claimed job and records its outcome on the queue.
async fn handle_job(
    queue: &dyn QueueAdapter,
    ingestor: &MemoryIngestor,
    bus: &EventBus,
    claimed: ClaimedJob,
) {
    let ClaimedJob { id, job } = claimed;
    debug!(job_id = id, user_id = %job.user_id, attempt = job.attempt, "processing memory job");

    match ingestor.process(id, &job).await {
        Ok(records) => match queue.complete(id).await {
            Ok(()) => {
                info!(job_id = id, user_id = %job.user_id, records, "memory job completed");
                bus.publish(JobEvent::Completed {
                    job_id: id,
                    user_id: job.user_id,
                    records,
                });
            }
            Err(e) => {
                error!(job_id = id, error = %e, "failed to mark memory job completed");
                bus.publish(JobEvent::WorkerError {
                    error: e.to_string(),
                });
            }
        },
        Err(job_error) => {
            let message = job_error.to_string();
            match queue.fail(id, &message).await {
                Ok(FailOutcome::Retrying { attempts, retry_at }) => {
                    warn!(
                        job_id = id,
                        user_id = %job.user_id,
                        attempt = attempts,
                        retry_at = %retry_at,
                        error = %message,
                        "memory job failed, will retry"
                    );
                    bus.publish(JobEvent::Failed {
                        job_id: id,
                        user_id: job.user_id,
                        attempts,
                        will_retry: true,
                        error: message,
                    });
                }
                Ok(FailOutcome::Exhausted { attempts }) => {
                    error!(
                        job_id = id,
                        user_id = %job.user_id,
                        attempt = attempts,
                        error = %message,
                        "memory job failed permanently"
                    );
                    bus.publish(JobEvent::Failed {
                        job_id: id,
                        user_id: job.user_id,
                        attempts,
                        will_retry: false,
                        error: message,
                    });
                }
                Err(e) => {
                    error!(job_id = id, error = %e, job_error = %message, "failed to record memory job failure");
                    bus.publish(JobEvent::WorkerError {
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionManager;
    use crate::test_support::{FailingEmbedder, GatedEmbedder, HashEmbedder};
    use parley_config::model::StorageConfig;
    use parley_core::types::MemoryJob;
    use parley_core::{EmbeddingAdapter, StorageAdapter, VectorStoreAdapter};
    use parley_storage::SqliteStorage;
    use tempfile::TempDir;

    use crate::store::SqliteVectorStore;

    struct Fixture {
        storage: Arc<SqliteStorage>,
        store: Arc<SqliteVectorStore>,
        _dir: TempDir,
    }

    async fn fixture(max_attempts: u32) -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage_config = StorageConfig {
            database_path: dir.path().join("worker.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let queue_config = QueueConfig {
            max_attempts,
            backoff_base_ms: 0,
            enqueue_delay_ms: 0,
            poll_interval_ms: 10,
            ..QueueConfig::default()
        };
        let storage = Arc::new(SqliteStorage::new(storage_config, queue_config));
        storage.initialize().await.unwrap();
        let store = Arc::new(SqliteVectorStore::new(storage.database().unwrap()));
        Fixture {
            storage,
            store,
            _dir: dir,
        }
    }

    fn pool(f: &Fixture, embedder: Arc<dyn EmbeddingAdapter>, bus: EventBus) -> WorkerPool {
        let collections = Arc::new(CollectionManager::new(f.store.clone(), "user_memories_", 8));
        let ingestor = Arc::new(MemoryIngestor::new(collections, embedder));
        WorkerPool::new(
            f.storage.clone(),
            ingestor,
            bus,
            WorkerSettings {
                concurrency: 2,
                poll_interval: Duration::from_millis(10),
                drain_timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test]
    async fn successful_job_is_completed_and_announced() {
        let f = fixture(3).await;
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let pool = pool(&f, Arc::new(HashEmbedder::new(8)), bus);

        let id = f.storage.enqueue(&MemoryJob::new("u1", "I know SQL")).await.unwrap();
        assert_eq!(pool.run_until_idle().await, 1);

        let counts = f.storage.counts().await.unwrap();
        assert_eq!(counts.completed, 1);
        assert_eq!(f.store.count("user_memories_u1").await.unwrap(), 1);

        let envelope = events.recv().await.unwrap();
        assert_eq!(
            envelope.event,
            JobEvent::Completed {
                job_id: id,
                user_id: "u1".into(),
                records: 1
            }
        );
    }

    #[tokio::test]
    async fn failing_job_retries_then_exhausts() {
        let f = fixture(2).await;
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let pool = pool(&f, Arc::new(FailingEmbedder), bus);

        f.storage.enqueue(&MemoryJob::new("u1", "lost")).await.unwrap();
        // Zero backoff makes the retry immediately claimable.
        assert_eq!(pool.run_until_idle().await, 2);

        let counts = f.storage.counts().await.unwrap();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 0);

        let first = events.recv().await.unwrap().event;
        let second = events.recv().await.unwrap().event;
        assert!(matches!(first, JobEvent::Failed { will_retry: true, attempts: 1, .. }));
        assert!(matches!(second, JobEvent::Failed { will_retry: false, attempts: 2, .. }));
    }

    async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while !done() {
            assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn undecodable_job_is_announced_as_failed() {
        let f = fixture(3).await;
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let pool = pool(&f, Arc::new(HashEmbedder::new(8)), bus);

        f.storage
            .database()
            .unwrap()
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO queue (queue_name, payload, available_at)
                     VALUES ('memory-processing', 'not json', '2000-01-01T00:00:00.000Z')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(pool.run_until_idle().await, 1);
        assert_eq!(f.storage.counts().await.unwrap().failed, 1);

        match events.try_recv().unwrap().event {
            JobEvent::Failed {
                user_id,
                attempts,
                will_retry,
                error,
                ..
            } => {
                assert!(user_id.is_empty());
                assert_eq!(attempts, 1);
                assert!(!will_retry);
                assert!(error.contains("malformed payload"));
            }
            other => panic!("expected a Failed event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_flight_jobs_never_exceed_concurrency() {
        let f = fixture(3).await;
        let embedder = Arc::new(GatedEmbedder::new(8));
        let pool = pool(&f, embedder.clone(), EventBus::default());
        for i in 0..5 {
            f.storage
                .enqueue(&MemoryJob::new("u1", format!("held fact {i}")))
                .await
                .unwrap();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { pool.run(cancel).await }
        });

        wait_until("two held jobs", || embedder.in_flight() == 2).await;
        // Give the claim loop time to overshoot if the slots leaked.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(embedder.in_flight(), 2);
        assert_eq!(f.storage.counts().await.unwrap().pending, 3);

        embedder.release(5);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while f.storage.counts().await.unwrap().completed < 5 {
            assert!(tokio::time::Instant::now() < deadline, "jobs were not processed in time");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(embedder.peak(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_drains_the_job_in_flight() {
        let f = fixture(3).await;
        let embedder = Arc::new(GatedEmbedder::new(8));
        let pool = pool(&f, embedder.clone(), EventBus::default());
        f.storage.enqueue(&MemoryJob::new("u1", "held during shutdown")).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { pool.run(cancel).await }
        });

        wait_until("the job to reach the embedder", || embedder.in_flight() == 1).await;
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "run returned with a job still in flight");

        embedder.release(1);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pool should stop once the job finishes")
            .unwrap();

        let counts = f.storage.counts().await.unwrap();
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.processing, 0);
        assert_eq!(f.store.count("user_memories_u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_processes_jobs_and_stops_on_cancel() {
        let f = fixture(3).await;
        let pool = pool(&f, Arc::new(HashEmbedder::new(8)), EventBus::default());
        for i in 0..6 {
            f.storage
                .enqueue(&MemoryJob::new("u1", format!("fact number {i}")))
                .await
                .unwrap();
        }

        let cancel = CancellationToken::new();
        let runner = {
            let cancel = cancel.clone();
            async move { pool.run(cancel).await }
        };
        let handle = tokio::spawn(runner);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if f.storage.counts().await.unwrap().completed == 6 {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "jobs were not processed in time");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pool should stop after cancellation")
            .unwrap();
        assert_eq!(f.store.scroll("user_memories_u1", "u1").await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn cancelled_pool_claims_nothing() {
        let f = fixture(3).await;
        let pool = pool(&f, Arc::new(HashEmbedder::new(8)), EventBus::default());
        f.storage.enqueue(&MemoryJob::new("u1", "later")).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        pool.run(cancel).await;
        assert_eq!(f.storage.counts().await.unwrap().pending, 1);
    }
}
