//! API handlers for the HTTP surface.

pub mod app;
pub mod auth;
pub mod files;
pub mod users;

pub use app::*;
pub use auth::*;
pub use files::*;
pub use users::*;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::SessionManager;
use crate::config::Config;
use crate::db::Database;
use crate::file::ContentStore;
use crate::kv::KeyValueStore;
use crate::queue::JobQueue;

/// Application state shared across handlers.
///
/// Every store handle is created once at startup and shared here.
#[derive(Clone)]
pub struct AppState {
    /// Document store.
    pub db: Database,
    /// Key-value store backing the sessions.
    pub kv: Arc<dyn KeyValueStore>,
    pub sessions: SessionManager,
    pub content: ContentStore,
    pub queue: JobQueue,
    /// Request body cap in bytes.
    pub max_body_size: usize,
}

impl AppState {
    /// Build the state from already opened stores.
    pub fn new(db: Database, kv: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        let sessions = SessionManager::with_ttl(
            kv.clone(),
            Duration::from_secs(config.session.ttl_secs),
        );
        let queue = JobQueue::new(db.pool().clone(), &config.queue);
        let content = ContentStore::new(&config.files.folder_path);

        Self {
            db,
            kv,
            sessions,
            content,
            queue,
            max_body_size: config.files.max_request_body_bytes(),
        }
    }
}
