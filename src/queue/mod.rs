//! Background job queue for Files Manager.
//!
//! Pipelines submit jobs; workers in the server process or in the
//! standalone worker binary consume them from the shared `jobs` table.

mod job;
mod store;
mod worker;

pub use job::{Job, JobStatus, QueueName, ThumbnailJob, WelcomeJob};
pub use store::JobQueue;
pub use worker::{spawn_workers, JobError, JobHandler, RunOutcome, Worker};
