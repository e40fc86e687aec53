//! In-Process Cache Backend
//!
//! Map-based backend with TTL expiry, a dependency-tag index for bulk
//! invalidation, and capacity-bounded eviction of the least recently used
//! entry. A single instance is shared across all invocations of a process;
//! interior locking makes it safe under concurrent access.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheBackend, CacheEntry, CacheStats, PutOptions, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{CacheError, CacheResult};
use crate::validate::PayloadSchema;

// == Access Order ==
/// Tracks key access order for capacity eviction.
///
/// Front = most recently used, back = least recently used.
#[derive(Debug, Default)]
struct AccessOrder {
    order: VecDeque<String>,
}

impl AccessOrder {
    /// Marks a key as most recently used.
    fn touch(&mut self, key: &str) {
        self.forget(key);
        self.order.push_front(key.to_string());
    }

    /// Drops a key from the tracking order.
    fn forget(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    /// Removes and returns the least recently used key.
    fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}

// == Inner State ==
/// State behind the lock: entries, the tag index, access order and counters.
#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// Dependency tag -> keys registered under it
    tag_index: HashMap<String, HashSet<String>>,
    order: AccessOrder,
    stats: CacheStats,
}

impl Inner {
    /// Removes one entry and every trace of it (order, tag registrations).
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.forget(key);
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }
}

// == Memory Cache ==
/// In-process cache backend.
#[derive(Debug)]
pub struct MemoryCache {
    inner: RwLock<Inner>,
    /// Maximum number of entries before LRU eviction kicks in
    max_entries: usize,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a new MemoryCache bounded to `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_entries,
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed. Correctness never depends on
    /// this being called (expiry is enforced on every `get`); it releases
    /// memory held by entries nobody asks for anymore. Driven by the
    /// background sweep task.
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            inner.remove_entry(&key);
        }

        inner.stats.record_expired(count as u64);
        let total = inner.entries.len();
        inner.stats.set_total_entries(total);
        count
    }

    // == Remove ==
    /// Removes a single entry by key.
    ///
    /// Returns true if an entry existed. Not part of the backend contract;
    /// used by cache services that expose per-key deletion.
    pub async fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.remove_entry(key).is_some();
        let total = inner.entries.len();
        inner.stats.set_total_entries(total);
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the backend counters.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    /// Current number of live entries (expired-but-unswept included).
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Returns true if no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(
        &self,
        key: &str,
        validator: Option<&dyn PayloadSchema>,
    ) -> CacheResult<Option<Value>> {
        // Write lock: a lookup updates access order and counters
        let mut inner = self.inner.write().await;

        let entry = match inner.entries.get(key) {
            Some(entry) => entry,
            None => {
                inner.stats.record_miss();
                return Ok(None);
            }
        };

        if entry.is_expired() {
            inner.remove_entry(key);
            inner.stats.record_expired(1);
            inner.stats.record_miss();
            let total = inner.entries.len();
            inner.stats.set_total_entries(total);
            return Ok(None);
        }

        let value = entry.value.clone();

        if let Some(validator) = validator {
            if let Err(violation) = validator.validate(&value) {
                // Stale shape: drop the entry and report absence
                debug!(key, %violation, "dropping cache entry failing validation");
                inner.remove_entry(key);
                inner.stats.record_miss();
                let total = inner.entries.len();
                inner.stats.set_total_entries(total);
                return Ok(None);
            }
        }

        inner.stats.record_hit();
        inner.order.touch(key);
        Ok(Some(value))
    }

    async fn put(&self, key: &str, value: Value, options: PutOptions) -> CacheResult<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::Rejected(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        let serialized_len = value.to_string().len();
        if serialized_len > MAX_VALUE_SIZE {
            return Err(CacheError::Rejected(format!(
                "value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        if options.ttl_seconds == 0 {
            // "Do not persist" - storing an already-dead entry is pointless
            return Ok(());
        }

        let mut inner = self.inner.write().await;

        // Overwrite: clear previous order position and tag registrations
        let is_overwrite = inner.remove_entry(key).is_some();

        if !is_overwrite && inner.entries.len() >= self.max_entries {
            match inner.order.pop_oldest() {
                Some(oldest) => {
                    inner.remove_entry(&oldest);
                    inner.stats.record_eviction();
                }
                None => {
                    return Err(CacheError::Backend(
                        "cache is full and eviction failed".to_string(),
                    ));
                }
            }
        }

        let entry = CacheEntry::new(value, options.ttl_seconds, options.dependency_tags.clone());
        for tag in &options.dependency_tags {
            inner
                .tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        inner.entries.insert(key.to_string(), entry);
        inner.order.touch(key);

        inner.stats.record_store();
        let total = inner.entries.len();
        inner.stats.set_total_entries(total);
        Ok(())
    }

    async fn invalidate(&self, tags: &[String]) -> CacheResult<usize> {
        let mut inner = self.inner.write().await;

        let mut removed = 0;
        for tag in tags {
            let keys: Vec<String> = match inner.tag_index.get(tag) {
                Some(keys) => keys.iter().cloned().collect(),
                None => continue, // No entries under this tag: a no-op
            };
            for key in keys {
                if inner.remove_entry(&key).is_some() {
                    removed += 1;
                }
            }
        }

        inner.stats.record_invalidated(removed as u64);
        let total = inner.entries.len();
        inner.stats.set_total_entries(total);
        Ok(removed)
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.tag_index.clear();
        inner.order.clear();
        inner.stats.set_total_entries(0);
        Ok(())
    }
}
