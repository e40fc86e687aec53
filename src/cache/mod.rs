//! Cache Abstraction Module
//!
//! Capability interface over interchangeable cache backends, plus the
//! backends themselves: no-op (caching disabled), in-process with TTL and
//! tag-based invalidation, and a remote HTTP key/value store.

mod entry;
mod http;
mod memory;
mod noop;
mod stats;

#[cfg(test)]
mod property_tests;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::error::CacheResult;
use crate::validate::PayloadSchema;

// Re-export public types
pub use entry::CacheEntry;
pub use http::HttpCache;
pub use memory::MemoryCache;
pub use noop::NoopCache;
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Put Options ==
/// Storage options for a single `put`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Validity window in seconds; 0 means "do not persist"
    pub ttl_seconds: u64,
    /// Invalidation-grouping tags this entry is registered under
    pub dependency_tags: Vec<String>,
}

impl PutOptions {
    /// Options with a TTL and no dependency tags.
    pub fn ttl(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            dependency_tags: Vec::new(),
        }
    }

    /// Options with a TTL and dependency tags.
    pub fn new(ttl_seconds: u64, dependency_tags: Vec<String>) -> Self {
        Self {
            ttl_seconds,
            dependency_tags,
        }
    }
}

// == Cache Backend Trait ==
/// Capability interface implemented by every cache backend.
///
/// Backends are interchangeable: all of them honor TTL expiry (an entry is
/// invisible to `get` once its TTL has elapsed, even if not yet physically
/// evicted) and tag invalidation. Absence on `get` is a normal outcome, not
/// an error. Backend failures surface as `CacheError` and are recovered by
/// the pipeline.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Looks up a key.
    ///
    /// If a validator is supplied and the stored value fails it, the entry
    /// is treated as absent and dropped: the abstraction never returns data
    /// that fails the caller's shape contract.
    async fn get(
        &self,
        key: &str,
        validator: Option<&dyn PayloadSchema>,
    ) -> CacheResult<Option<Value>>;

    /// Stores a value, overwriting any existing entry at the key and
    /// registering it under each dependency tag for bulk invalidation.
    async fn put(&self, key: &str, value: Value, options: PutOptions) -> CacheResult<()>;

    /// Removes every entry registered under any of the listed tags.
    ///
    /// Idempotent; invalidating tags with no entries is a no-op. Returns the
    /// number of entries removed.
    async fn invalidate(&self, tags: &[String]) -> CacheResult<usize>;

    /// Removes all entries unconditionally.
    async fn clear(&self) -> CacheResult<()>;
}

// == Backend Selection ==
/// Chooses a backend from configuration.
///
/// Caching disabled selects the no-op backend; a configured remote URL
/// selects the HTTP backend; otherwise the in-process backend is used.
pub fn backend_from_config(config: &PipelineConfig) -> Arc<dyn CacheBackend> {
    if !config.cache_enabled {
        return Arc::new(NoopCache::new());
    }
    match &config.cache_url {
        Some(url) => Arc::new(HttpCache::new(url)),
        None => Arc::new(MemoryCache::new(config.max_entries)),
    }
}
