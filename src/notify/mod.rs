//! Welcome notifications.
//!
//! The transport is pluggable behind [`NotificationSink`]; the default sink
//! only logs. Delivery failures are logged and swallowed so they never turn
//! into queue retries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::db::{Database, User, UserRepository};
use crate::queue::{Job, JobError, JobHandler, QueueName, WelcomeJob};
use crate::Result;

/// Delivers a notification to a user.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_welcome(&self, user: &User) -> Result<()>;
}

/// Sink that writes the greeting to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send_welcome(&self, user: &User) -> Result<()> {
        info!(user_id = user.id, "Welcome {}!", user.email);
        Ok(())
    }
}

/// Consumes the `welcome` queue.
pub struct WelcomeHandler {
    db: Database,
    sink: Arc<dyn NotificationSink>,
}

impl WelcomeHandler {
    pub fn new(db: Database, sink: Arc<dyn NotificationSink>) -> Self {
        Self { db, sink }
    }
}

#[async_trait]
impl JobHandler for WelcomeHandler {
    fn queue(&self) -> QueueName {
        QueueName::Welcome
    }

    async fn handle(&self, job: &Job) -> std::result::Result<(), JobError> {
        let payload: WelcomeJob = job
            .payload_as()
            .map_err(|e| JobError::Permanent(format!("Invalid payload: {e}")))?;
        let user_id = payload
            .user_id
            .ok_or_else(|| JobError::Permanent("Missing userId".to_string()))?;

        let user = UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| JobError::Permanent("User not found".to_string()))?;

        if let Err(e) = self.sink.send_welcome(&user).await {
            error!(job_id = job.id, user_id, "Welcome notification failed: {}", e);
        }
        Ok(())
    }
}
