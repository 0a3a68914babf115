//! Durable job queue over the `jobs` table.
//!
//! Delivery is at-least-once. A claimed job holds a lease; if the worker
//! dies before acknowledging, the lease runs out and the job is handed to
//! the next `reserve` call.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::job::{Job, JobStatus, QueueName};
use crate::config::QueueConfig;
use crate::datetime::now_millis;
use crate::db::DbPool;
use crate::{FilesManagerError, Result};

/// Largest exponent used when computing retry delays.
const MAX_BACKOFF_SHIFT: i64 = 20;

const JOB_COLUMNS: &str = "id, queue, payload, status, attempts, max_attempts, run_at, \
                           locked_until, last_error, created_at";

/// Handle to the shared job queue.
///
/// Cheap to clone; every clone talks to the same pool.
#[derive(Clone)]
pub struct JobQueue {
    pool: DbPool,
    max_attempts: u32,
    backoff_ms: u64,
    lease: Duration,
}

impl JobQueue {
    /// Create a queue handle using the retry settings from `config`.
    pub fn new(pool: DbPool, config: &QueueConfig) -> Self {
        Self {
            pool,
            max_attempts: config.max_attempts,
            backoff_ms: config.backoff_ms,
            lease: Duration::from_secs(config.lease_secs),
        }
    }

    /// Add a job to `queue`. Returns the job id.
    pub async fn submit<T: Serialize>(&self, queue: QueueName, payload: &T) -> Result<i64> {
        let payload = serde_json::to_string(payload)
            .map_err(|e| FilesManagerError::Queue(format!("payload encoding failed: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO jobs (queue, payload, status, attempts, max_attempts, run_at)
             VALUES (?, ?, 'waiting', 0, ?, ?)",
        )
        .bind(queue.as_str())
        .bind(&payload)
        .bind(self.max_attempts as i64)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(job_id = id, %queue, "Job submitted");
        Ok(id)
    }

    /// Claim the oldest runnable job on `queue`, if any.
    ///
    /// Runnable means waiting with `run_at` in the past, or active with an
    /// expired lease. Claiming bumps `attempts` and starts a new lease.
    /// Expired jobs that have used up their attempts are failed instead.
    pub async fn reserve(&self, queue: QueueName) -> Result<Option<Job>> {
        let now = now_millis();

        let abandoned = sqlx::query(
            "UPDATE jobs
             SET status = 'failed', locked_until = NULL,
                 last_error = COALESCE(last_error, 'lease expired')
             WHERE queue = ? AND status = 'active' AND locked_until <= ?
               AND attempts >= max_attempts",
        )
        .bind(queue.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if abandoned > 0 {
            warn!(%queue, abandoned, "Failed jobs whose lease expired on the last attempt");
        }

        let lease_until = now + self.lease.as_millis() as i64;
        let sql = format!(
            "UPDATE jobs
             SET status = 'active', attempts = attempts + 1, locked_until = ?
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE queue = ?
                   AND ((status = 'waiting' AND run_at <= ?)
                        OR (status = 'active' AND locked_until <= ?))
                 ORDER BY run_at, id
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        );

        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(lease_until)
            .bind(queue.as_str())
            .bind(now)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(ref job) = job {
            debug!(job_id = job.id, %queue, attempt = job.attempts, "Job reserved");
        }
        Ok(job)
    }

    /// Mark a job completed.
    pub async fn ack(&self, job_id: i64) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'completed', locked_until = NULL WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        debug!(job_id, "Job completed");
        Ok(())
    }

    /// Mark a job failed for good.
    pub async fn fail(&self, job_id: i64, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', locked_until = NULL, last_error = ? WHERE id = ?",
        )
        .bind(reason)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        warn!(job_id, reason, "Job failed");
        Ok(())
    }

    /// Put a job back with exponential backoff, or fail it when it has no
    /// attempts left. Returns `true` if the job was re-queued.
    pub async fn retry(&self, job: &Job, reason: &str) -> Result<bool> {
        if job.attempts >= job.max_attempts {
            self.fail(job.id, reason).await?;
            return Ok(false);
        }

        let delay = self.backoff_delay(job.attempts);
        let run_at = now_millis() + delay.as_millis() as i64;

        sqlx::query(
            "UPDATE jobs
             SET status = 'waiting', locked_until = NULL, run_at = ?, last_error = ?
             WHERE id = ?",
        )
        .bind(run_at)
        .bind(reason)
        .bind(job.id)
        .execute(&self.pool)
        .await?;

        info!(
            job_id = job.id,
            attempt = job.attempts,
            delay_ms = delay.as_millis() as u64,
            "Job scheduled for retry"
        );
        Ok(true)
    }

    /// Delay before the next delivery after `attempts` deliveries.
    pub fn backoff_delay(&self, attempts: i64) -> Duration {
        let shift = (attempts - 1).clamp(0, MAX_BACKOFF_SHIFT) as u32;
        Duration::from_millis(self.backoff_ms.saturating_mul(1u64 << shift))
    }

    /// Fetch a job by id.
    pub async fn get(&self, job_id: i64) -> Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?");
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Number of jobs on `queue` in `status`.
    pub async fn count_by_status(&self, queue: QueueName, status: JobStatus) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue = ? AND status = ?")
                .bind(queue.as_str())
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("max_attempts", &self.max_attempts)
            .field("backoff_ms", &self.backoff_ms)
            .field("lease", &self.lease)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::queue::job::{ThumbnailJob, WelcomeJob};

    fn config(backoff_ms: u64, lease_secs: u64) -> QueueConfig {
        QueueConfig {
            max_attempts: 3,
            backoff_ms,
            lease_secs,
            ..QueueConfig::default()
        }
    }

    async fn setup(backoff_ms: u64, lease_secs: u64) -> (Database, JobQueue) {
        let db = Database::open_in_memory().await.unwrap();
        let queue = JobQueue::new(db.pool().clone(), &config(backoff_ms, lease_secs));
        (db, queue)
    }

    #[tokio::test]
    async fn test_submit_and_reserve() {
        let (_db, queue) = setup(1000, 300).await;

        let id = queue
            .submit(QueueName::Thumbnail, &ThumbnailJob::new(1, 2))
            .await
            .unwrap();

        let job = queue.reserve(QueueName::Thumbnail).await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.status(), Some(JobStatus::Active));
        assert_eq!(
            job.payload_as::<ThumbnailJob>().unwrap(),
            ThumbnailJob::new(1, 2)
        );

        // Leased, so not handed out again.
        assert!(queue.reserve(QueueName::Thumbnail).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queues_are_separate() {
        let (_db, queue) = setup(1000, 300).await;

        queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();

        assert!(queue.reserve(QueueName::Thumbnail).await.unwrap().is_none());
        assert!(queue.reserve(QueueName::Welcome).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reserve_in_submission_order() {
        let (_db, queue) = setup(1000, 300).await;

        let first = queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();
        let second = queue
            .submit(QueueName::Welcome, &WelcomeJob::new(2))
            .await
            .unwrap();

        assert_eq!(queue.reserve(QueueName::Welcome).await.unwrap().unwrap().id, first);
        assert_eq!(queue.reserve(QueueName::Welcome).await.unwrap().unwrap().id, second);
    }

    #[tokio::test]
    async fn test_ack() {
        let (_db, queue) = setup(1000, 300).await;

        queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();
        let job = queue.reserve(QueueName::Welcome).await.unwrap().unwrap();
        queue.ack(job.id).await.unwrap();

        assert_eq!(
            queue
                .count_by_status(QueueName::Welcome, JobStatus::Completed)
                .await
                .unwrap(),
            1
        );
        assert!(queue.reserve(QueueName::Welcome).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_backs_off_then_fails() {
        let (_db, queue) = setup(0, 300).await;

        let id = queue
            .submit(QueueName::Thumbnail, &ThumbnailJob::new(1, 2))
            .await
            .unwrap();

        for attempt in 1..=2 {
            let job = queue.reserve(QueueName::Thumbnail).await.unwrap().unwrap();
            assert_eq!(job.attempts, attempt);
            assert!(queue.retry(&job, "disk full").await.unwrap());
        }

        let job = queue.reserve(QueueName::Thumbnail).await.unwrap().unwrap();
        assert_eq!(job.attempts, 3);
        assert!(!queue.retry(&job, "disk full").await.unwrap());

        let stored = queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), Some(JobStatus::Failed));
        assert_eq!(stored.last_error.as_deref(), Some("disk full"));
        assert!(queue.reserve(QueueName::Thumbnail).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_delays_next_delivery() {
        let (_db, queue) = setup(60_000, 300).await;

        queue
            .submit(QueueName::Thumbnail, &ThumbnailJob::new(1, 2))
            .await
            .unwrap();
        let job = queue.reserve(QueueName::Thumbnail).await.unwrap().unwrap();
        assert!(queue.retry(&job, "busy").await.unwrap());

        assert!(queue.reserve(QueueName::Thumbnail).await.unwrap().is_none());
        assert_eq!(
            queue
                .count_by_status(QueueName::Thumbnail, JobStatus::Waiting)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_backoff_delay_doubles() {
        let (_db, queue) = setup(1000, 300).await;

        assert_eq!(queue.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(queue.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(queue.backoff_delay(3), Duration::from_millis(4000));
        assert_eq!(queue.backoff_delay(0), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_fail_is_permanent() {
        let (_db, queue) = setup(0, 300).await;

        let id = queue
            .submit(QueueName::Welcome, &WelcomeJob::new(1))
            .await
            .unwrap();
        let job = queue.reserve(QueueName::Welcome).await.unwrap().unwrap();
        queue.fail(job.id, "User not found").await.unwrap();

        let stored = queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), Some(JobStatus::Failed));
        assert_eq!(stored.attempts, 1);
        assert!(queue.reserve(QueueName::Welcome).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_lease_is_redelivered() {
        let (_db, queue) = setup(0, 0).await;

        let id = queue
            .submit(QueueName::Thumbnail, &ThumbnailJob::new(1, 2))
            .await
            .unwrap();

        let first = queue.reserve(QueueName::Thumbnail).await.unwrap().unwrap();
        // Lease of zero seconds: the worker "crashed" immediately.
        let second = queue.reserve(QueueName::Thumbnail).await.unwrap().unwrap();

        assert_eq!(first.id, id);
        assert_eq!(second.id, id);
        assert_eq!(second.attempts, 2);
    }

    #[tokio::test]
    async fn test_expired_lease_on_last_attempt_fails() {
        let (_db, queue) = setup(0, 0).await;

        let id = queue
            .submit(QueueName::Thumbnail, &ThumbnailJob::new(1, 2))
            .await
            .unwrap();

        for _ in 0..3 {
            queue.reserve(QueueName::Thumbnail).await.unwrap().unwrap();
        }
        assert!(queue.reserve(QueueName::Thumbnail).await.unwrap().is_none());

        let stored = queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), Some(JobStatus::Failed));
        assert_eq!(stored.last_error.as_deref(), Some("lease expired"));
    }
}
