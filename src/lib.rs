//! Files Manager - file storage service with sessions and background jobs.
//!
//! Users store files, images and folders in a per-user hierarchy, publish
//! them for anonymous reading, and get thumbnails generated for images by
//! background workers.

pub mod auth;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod kv;
pub mod logging;
pub mod notify;
pub mod queue;
pub mod web;

pub use auth::{
    authenticate, hash_password, register, verify_password, PasswordError, RegistrationError,
    SessionManager,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{FilesManagerError, Result};
pub use file::{
    ContentStore, FileRecord, FileRepository, FileType, NewFile, ThumbnailHandler,
    UploadPipeline, UploadRequest,
};
pub use kv::{KeyValueStore, MemoryStore};
pub use notify::{LogSink, NotificationSink, WelcomeHandler};
pub use queue::{spawn_workers, JobError, JobHandler, JobQueue, QueueName, Worker};
pub use web::{create_router, AppState, WebServer};
