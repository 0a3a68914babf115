//! Worker runtime: pull jobs, run a handler, record the outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::job::{Job, QueueName};
use super::store::JobQueue;
use crate::config::QueueConfig;
use crate::{FilesManagerError, Result};

/// Failure reported by a job handler.
#[derive(Error, Debug)]
pub enum JobError {
    /// The job can never succeed (malformed payload, record gone).
    #[error("{0}")]
    Permanent(String),

    /// The job may succeed if delivered again.
    #[error("{0}")]
    Transient(String),
}

impl From<FilesManagerError> for JobError {
    fn from(e: FilesManagerError) -> Self {
        if e.is_client_error() {
            JobError::Permanent(e.to_string())
        } else {
            JobError::Transient(e.to_string())
        }
    }
}

/// Processes jobs from one queue.
///
/// Handlers must tolerate redelivery of the same job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Queue this handler consumes.
    fn queue(&self) -> QueueName;

    /// Process one job.
    async fn handle(&self, job: &Job) -> std::result::Result<(), JobError>;
}

/// What a single [`Worker::run_once`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was runnable.
    Idle,
    Completed,
    Retried,
    Failed,
}

/// A single consumer bound to one handler.
pub struct Worker {
    queue: JobQueue,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(queue: JobQueue, handler: Arc<dyn JobHandler>, poll_interval: Duration) -> Self {
        Self {
            queue,
            handler,
            poll_interval,
        }
    }

    /// Reserve and process at most one job.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let name = self.handler.queue();
        let Some(job) = self.queue.reserve(name).await? else {
            return Ok(RunOutcome::Idle);
        };

        debug!(job_id = job.id, queue = %name, attempt = job.attempts, "Processing job");

        match self.handler.handle(&job).await {
            Ok(()) => {
                self.queue.ack(job.id).await?;
                Ok(RunOutcome::Completed)
            }
            Err(JobError::Permanent(reason)) => {
                self.queue.fail(job.id, &reason).await?;
                Ok(RunOutcome::Failed)
            }
            Err(JobError::Transient(reason)) => {
                warn!(job_id = job.id, queue = %name, attempt = job.attempts, "Job attempt failed: {}", reason);
                if self.queue.retry(&job, &reason).await? {
                    Ok(RunOutcome::Retried)
                } else {
                    Ok(RunOutcome::Failed)
                }
            }
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let name = self.handler.queue();
        info!(
            queue = %name,
            "Worker started (poll interval: {} ms)",
            self.poll_interval.as_millis()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.run_once().await {
                Ok(RunOutcome::Idle) => true,
                Ok(_) => false,
                Err(e) => {
                    error!(queue = %name, "Worker error: {}", e);
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!(queue = %name, "Worker stopped");
    }
}

/// Start `config.concurrency` workers for each handler.
pub fn spawn_workers(
    queue: &JobQueue,
    handlers: Vec<Arc<dyn JobHandler>>,
    config: &QueueConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let mut tasks = Vec::with_capacity(handlers.len() * config.concurrency);

    for handler in handlers {
        for _ in 0..config.concurrency {
            let worker = Worker::new(queue.clone(), handler.clone(), poll_interval);
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                worker.run(shutdown).await;
            }));
        }
    }

    info!("Spawned {} worker task(s)", tasks.len());
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::queue::job::{JobStatus, WelcomeJob};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedHandler {
        calls: AtomicUsize,
        outcome: fn(usize) -> std::result::Result<(), JobError>,
    }

    #[async_trait]
    impl JobHandler for ScriptedHandler {
        fn queue(&self) -> QueueName {
            QueueName::Welcome
        }

        async fn handle(&self, _job: &Job) -> std::result::Result<(), JobError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)(call)
        }
    }

    async fn setup(
        outcome: fn(usize) -> std::result::Result<(), JobError>,
    ) -> (Database, JobQueue, Arc<ScriptedHandler>, Worker) {
        let db = Database::open_in_memory().await.unwrap();
        let config = QueueConfig {
            backoff_ms: 0,
            ..QueueConfig::default()
        };
        let queue = JobQueue::new(db.pool().clone(), &config);
        let handler = Arc::new(ScriptedHandler {
            calls: AtomicUsize::new(0),
            outcome,
        });
        let worker = Worker::new(queue.clone(), handler.clone(), Duration::from_millis(10));
        (db, queue, handler, worker)
    }

    #[tokio::test]
    async fn test_idle_when_empty() {
        let (_db, _queue, handler, worker) = setup(|_| Ok(())).await;
        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Idle);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_acks() {
        let (_db, queue, _handler, worker) = setup(|_| Ok(())).await;
        queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();

        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Completed);
        assert_eq!(
            queue
                .count_by_status(QueueName::Welcome, JobStatus::Completed)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let (_db, queue, handler, worker) =
            setup(|_| Err(JobError::Permanent("Missing userId".into()))).await;
        queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();

        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Failed);
        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Idle);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_retries_until_success() {
        let (_db, queue, handler, worker) = setup(|call| {
            if call == 0 {
                Err(JobError::Transient("database is locked".into()))
            } else {
                Ok(())
            }
        })
        .await;
        queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();

        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Retried);
        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Completed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transient_error_exhausts_attempts() {
        let (_db, queue, handler, worker) =
            setup(|_| Err(JobError::Transient("still broken".into()))).await;
        queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();

        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Retried);
        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Retried);
        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Failed);
        assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Idle);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_job_error_from_crate_error() {
        let e: JobError = FilesManagerError::NotFound("File not found".into()).into();
        assert!(matches!(e, JobError::Permanent(ref m) if m == "File not found"));

        let e: JobError = FilesManagerError::Database("locked".into()).into();
        assert!(matches!(e, JobError::Transient(_)));
    }

    #[tokio::test]
    async fn test_spawned_workers_drain_and_stop() {
        let (_db, queue, handler, _worker) = setup(|_| Ok(())).await;
        for i in 0..4 {
            queue
                .submit(QueueName::Welcome, &WelcomeJob::new(i))
                .await
                .unwrap();
        }

        let config = QueueConfig {
            poll_interval_ms: 10,
            concurrency: 2,
            ..QueueConfig::default()
        };
        let (tx, rx) = watch::channel(false);
        let tasks = spawn_workers(
            &queue,
            vec![handler.clone() as Arc<dyn JobHandler>],
            &config,
            rx,
        );
        assert_eq!(tasks.len(), 2);

        for _ in 0..100 {
            let done = queue
                .count_by_status(QueueName::Welcome, JobStatus::Completed)
                .await
                .unwrap();
            if done == 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(true).unwrap();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(handler.calls.load(Ordering::SeqCst), 4);
    }
}
