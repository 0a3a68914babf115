//! Job records and payload types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Named queues consumed by the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    /// Thumbnail generation for uploaded images.
    Thumbnail,
    /// Welcome notification for new users.
    Welcome,
}

impl QueueName {
    /// Name stored in the `jobs.queue` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Thumbnail => "thumbnail",
            QueueName::Welcome => "welcome",
        }
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(JobStatus::Waiting),
            "active" => Some(JobStatus::Active),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// A job row as claimed from the queue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub queue: String,
    /// JSON payload.
    pub payload: String,
    pub status: String,
    /// Deliveries so far, including the current one.
    pub attempts: i64,
    pub max_attempts: i64,
    /// Earliest delivery time (unix millis).
    pub run_at: i64,
    /// Lease expiry while active (unix millis).
    pub locked_until: Option<i64>,
    pub last_error: Option<String>,
    pub created_at: String,
}

impl Job {
    /// Decode the JSON payload.
    pub fn payload_as<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }

    /// Parsed status, if the column holds a known value.
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::parse(&self.status)
    }
}

/// Payload of a `thumbnail` job.
///
/// Fields are optional on the way in so a malformed job can be told apart
/// from an undecodable one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<i64>,
}

impl ThumbnailJob {
    pub fn new(user_id: i64, file_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            file_id: Some(file_id),
        }
    }
}

/// Payload of a `welcome` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl WelcomeJob {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_names() {
        assert_eq!(QueueName::Thumbnail.as_str(), "thumbnail");
        assert_eq!(QueueName::Welcome.to_string(), "welcome");
    }

    #[test]
    fn test_status_parse() {
        for status in [
            JobStatus::Waiting,
            JobStatus::Active,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("paused"), None);
    }

    #[test]
    fn test_thumbnail_payload_wire_format() {
        let json = serde_json::to_value(ThumbnailJob::new(1, 2)).unwrap();
        assert_eq!(json, serde_json::json!({"userId": 1, "fileId": 2}));
    }

    #[test]
    fn test_payload_with_missing_field() {
        let job: ThumbnailJob = serde_json::from_str(r#"{"userId": 4}"#).unwrap();
        assert_eq!(job.user_id, Some(4));
        assert_eq!(job.file_id, None);

        let job: WelcomeJob = serde_json::from_str("{}").unwrap();
        assert_eq!(job.user_id, None);
    }
}
