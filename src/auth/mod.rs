//! Authentication module for Files Manager.
//!
//! This module provides password digests, credential checks, session
//! tokens and user registration.

mod credentials;
mod password;
mod registration;
mod session;

pub use credentials::authenticate;
pub use password::{hash_password, verify_password, PasswordError};
pub use registration::{register, RegistrationError};
pub use session::{SessionManager, DEFAULT_SESSION_DURATION_SECS};
