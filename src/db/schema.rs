//! Database schema and migrations for Files Manager.
//!
//! Migrations are applied in order; `schema_version` records which ones
//! have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- hex SHA-1 digest
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: files and folders
    r#"
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    name        TEXT NOT NULL,
    file_type   TEXT NOT NULL,           -- 'folder', 'file', 'image'
    parent_id   INTEGER NOT NULL DEFAULT 0,  -- 0 = root
    is_public   INTEGER NOT NULL DEFAULT 0,
    local_path  TEXT,                    -- NULL for folders
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK ((file_type = 'folder') = (local_path IS NULL))
);

CREATE INDEX idx_files_owner_parent ON files(user_id, parent_id, id);
"#,
    // v3: background jobs
    r#"
CREATE TABLE jobs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    queue         TEXT NOT NULL,
    payload       TEXT NOT NULL,         -- JSON
    status        TEXT NOT NULL DEFAULT 'waiting',  -- 'waiting', 'active', 'completed', 'failed'
    attempts      INTEGER NOT NULL DEFAULT 0,
    max_attempts  INTEGER NOT NULL,
    run_at        INTEGER NOT NULL,      -- unix millis
    locked_until  INTEGER,               -- unix millis, set while active
    last_error    TEXT,
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_jobs_runnable ON jobs(queue, status, run_at);
"#,
];
