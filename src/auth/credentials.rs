//! Credential verification for the connect flow.

use tracing::debug;

use crate::auth::verify_password;
use crate::db::{User, UserRepository};
use crate::{FilesManagerError, Result};

/// Look up a user by email and check the password.
///
/// Unknown email and wrong password produce the same `Auth` error.
pub async fn authenticate(repo: &UserRepository<'_>, email: &str, password: &str) -> Result<User> {
    let unauthorized = || FilesManagerError::Auth("Unauthorized".to_string());

    if email.is_empty() || password.is_empty() {
        return Err(unauthorized());
    }

    let user = repo.get_by_email(email).await?.ok_or_else(|| {
        debug!("Connect attempt for unknown email");
        unauthorized()
    })?;

    verify_password(password, &user.password).map_err(|_| {
        debug!(user_id = user.id, "Connect attempt with wrong password");
        unauthorized()
    })?;

    Ok(user)
}
