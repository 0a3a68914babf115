//! Expiring key-value store.
//!
//! Sessions only need `get`/`set with TTL`/`delete`, so the store is a
//! capability trait. [`MemoryStore`] is the in-process implementation;
//! a networked store can be dropped in behind the same trait.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::Result;

/// An expiring string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Whether the store is reachable.
    async fn is_alive(&self) -> bool;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process TTL map.
///
/// Expired entries are invisible to readers immediately. They are physically
/// removed on the next write to the same key, by [`MemoryStore::purge_expired`],
/// or periodically by [`MemoryStore::run_sweeper`]. Session tokens are never
/// rewritten, so a long-running process needs the sweeper.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Purged expired keys");
        }
        removed
    }

    /// Purge expired entries every `every` until `shutdown` flips to `true`
    /// or its sender is dropped.
    pub async fn run_sweeper(&self, every: Duration, mut shutdown: watch::Receiver<bool>) {
        info!("Key sweeper started (interval: {} ms)", every.as_millis());

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.purge_expired().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Key sweeper stopped");
    }

    /// Number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        true
    }
}
