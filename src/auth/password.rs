//! Password digests for Files Manager.
//!
//! Passwords are stored as the lowercase hex SHA-1 of the UTF-8 password,
//! with no salt. This matches the digests already held by existing account
//! stores. It is weak against offline attacks; moving to a salted KDF means
//! re-hashing on next login and is a separate migration.

use sha1::{Digest, Sha1};
use thiserror::Error;

/// Password-related errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password verification failed (wrong password).
    #[error("password verification failed")]
    VerificationFailed,
}

/// Hash a password into its stored digest.
///
/// # Examples
///
/// ```
/// use files_manager::auth::hash_password;
///
/// assert_eq!(
///     hash_password("password123"),
///     "cbfdac6008f9cab4083784cbd1874f76618d2a97"
/// );
/// ```
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha1::digest(password.as_bytes()))
}

/// Verify a password against a stored digest.
pub fn verify_password(password: &str, digest: &str) -> Result<(), PasswordError> {
    if hash_password(password).eq_ignore_ascii_case(digest) {
        Ok(())
    } else {
        Err(PasswordError::VerificationFailed)
    }
}
