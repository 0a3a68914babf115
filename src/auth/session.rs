//! Session token management for Files Manager.
//!
//! A session is a `auth_<token> -> user id` entry in the key-value store
//! with a fixed lifetime. Expiry is left to the store; nothing here refreshes
//! or polls it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::kv::KeyValueStore;
use crate::{FilesManagerError, Result};

/// Default session duration (24 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 24 * 60 * 60;

/// Key prefix for session entries.
const SESSION_KEY_PREFIX: &str = "auth_";

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

fn unauthorized() -> FilesManagerError {
    FilesManagerError::Auth("Unauthorized".to_string())
}

/// Issues, validates and revokes session tokens.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a session manager with the default 24 hour lifetime.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, Duration::from_secs(DEFAULT_SESSION_DURATION_SECS))
    }

    /// Create a session manager with a custom token lifetime.
    pub fn with_ttl(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new token for `user_id`.
    ///
    /// Tokens are random UUIDs and carry no user data.
    pub async fn issue(&self, user_id: i64) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.store
            .set_ex(&session_key(&token), &user_id.to_string(), self.ttl)
            .await?;

        info!(user_id, "Session issued");
        Ok(token)
    }

    /// Resolve a token to its user id.
    ///
    /// Fails with `Auth("Unauthorized")` when the token is empty, unknown or
    /// expired. Validation does not extend the token's lifetime.
    pub async fn validate(&self, token: &str) -> Result<i64> {
        if token.is_empty() {
            return Err(unauthorized());
        }

        let value = self
            .store
            .get(&session_key(token))
            .await?
            .ok_or_else(unauthorized)?;

        value.parse::<i64>().map_err(|_| {
            debug!("Session entry holds a non-numeric user id");
            unauthorized()
        })
    }

    /// Revoke a token immediately. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.store.del(&session_key(token)).await?;
        debug!("Session revoked");
        Ok(())
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish()
    }
}
