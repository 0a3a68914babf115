//! User registration for Files Manager.
//!
//! Registration stores the account and queues a welcome notification.

use thiserror::Error;
use tracing::info;

use crate::auth::hash_password;
use crate::db::{NewUser, User, UserRepository};
use crate::queue::{JobQueue, QueueName, WelcomeJob};
use crate::FilesManagerError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Missing email")]
    MissingEmail,

    #[error("Missing password")]
    MissingPassword,

    /// Email already registered.
    #[error("Already exist")]
    AlreadyExists,

    /// Store or queue failure.
    #[error(transparent)]
    Internal(FilesManagerError),
}

impl From<FilesManagerError> for RegistrationError {
    fn from(e: FilesManagerError) -> Self {
        match e {
            FilesManagerError::Conflict(_) => RegistrationError::AlreadyExists,
            other => RegistrationError::Internal(other),
        }
    }
}

impl From<RegistrationError> for FilesManagerError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::MissingEmail | RegistrationError::MissingPassword => {
                FilesManagerError::Validation(e.to_string())
            }
            RegistrationError::AlreadyExists => FilesManagerError::Conflict(e.to_string()),
            RegistrationError::Internal(inner) => inner,
        }
    }
}

/// Register a new user.
///
/// Checks are made in order: email present, password present, email unused.
/// The stored password is the digest from [`hash_password`]. A `welcome`
/// job is queued once the user row exists.
pub async fn register(
    repo: &UserRepository<'_>,
    queue: &JobQueue,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<User, RegistrationError> {
    let email = email
        .filter(|e| !e.is_empty())
        .ok_or(RegistrationError::MissingEmail)?;
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or(RegistrationError::MissingPassword)?;

    if repo.email_exists(email).await? {
        return Err(RegistrationError::AlreadyExists);
    }

    // Two concurrent registrations can both pass the check above; the
    // UNIQUE constraint turns the loser into `AlreadyExists`.
    let user = repo.create(&NewUser::new(email, hash_password(password))).await?;

    queue
        .submit(QueueName::Welcome, &WelcomeJob::new(user.id))
        .await?;

    info!(user_id = user.id, "User registered");
    Ok(user)
}
