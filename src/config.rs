//! Configuration module for Files Manager.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{FilesManagerError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
///
/// The document store is an SQLite file named `{dir}/{name}.db`. It is
/// embedded, so there is no host or port; `DB_HOST` and `DB_PORT` are
/// ignored and only `DB_DATABASE` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the database file.
    #[serde(default = "default_db_dir")]
    pub dir: String,
    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,
}

fn default_db_dir() -> String {
    "data".to_string()
}

fn default_db_name() -> String {
    "files_manager".to_string()
}

impl DatabaseConfig {
    /// Path of the SQLite database file.
    pub fn path(&self) -> PathBuf {
        Path::new(&self.dir).join(format!("{}.db", self.name))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dir: default_db_dir(),
            name: default_db_name(),
        }
    }
}

/// File content storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Root directory for stored file content.
    #[serde(default = "default_folder_path")]
    pub folder_path: String,
    /// Maximum decoded upload size in megabytes.
    ///
    /// Uploads travel base64-encoded inside JSON, so the request body limit
    /// is derived from this with [`FilesConfig::max_request_body_bytes`].
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_folder_path() -> String {
    "/tmp/files_manager".to_string()
}

fn default_max_upload_size() -> u64 {
    16
}

/// Room for the JSON envelope (name, type, parentId) around the data.
const REQUEST_ENVELOPE_BYTES: usize = 64 * 1024;

impl FilesConfig {
    /// Maximum decoded upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> usize {
        (self.max_upload_size_mb * 1024 * 1024) as usize
    }

    /// Request body limit that admits an upload of exactly
    /// [`FilesConfig::max_upload_size_bytes`]: base64 output size plus the
    /// JSON envelope.
    pub fn max_request_body_bytes(&self) -> usize {
        self.max_upload_size_bytes().div_ceil(3) * 4 + REQUEST_ENVELOPE_BYTES
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            folder_path: default_folder_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Token lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    /// How often expired tokens are purged from the in-process store.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Background job queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Deliveries per job before it is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base retry delay in milliseconds (doubled per attempt).
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Idle poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Seconds a claimed job stays leased before it is redelivered.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
    /// Workers per queue.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Run workers inside the HTTP server process.
    #[serde(default = "default_embedded_workers")]
    pub embedded_workers: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_lease_secs() -> u64 {
    300
}

fn default_concurrency() -> usize {
    2
}

fn default_embedded_workers() -> bool {
    true
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            lease_secs: default_lease_secs(),
            concurrency: default_concurrency(),
            embedded_workers: default_embedded_workers(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Job queue configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FilesManagerError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FilesManagerError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: listening port
    /// - `DB_DATABASE`: database name
    /// - `FOLDER_PATH`: content storage root
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(name) = lookup("DB_DATABASE").filter(|v| !v.is_empty()) {
            self.database.name = name;
        }
        if let Some(path) = lookup("FOLDER_PATH").filter(|v| !v.is_empty()) {
            self.files.folder_path = path;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.files.folder_path.trim().is_empty() {
            return Err(FilesManagerError::Config(
                "files.folder_path must not be empty".to_string(),
            ));
        }
        if self.queue.max_attempts == 0 {
            return Err(FilesManagerError::Config(
                "queue.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(FilesManagerError::Config(
                "session.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.queue.concurrency == 0 {
            return Err(FilesManagerError::Config(
                "queue.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
