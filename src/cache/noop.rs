//! No-Op Cache Backend
//!
//! Used when caching is disabled: every lookup misses, writes and
//! invalidations are discarded. Keeps the pipeline free of "is caching on"
//! branches.

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{CacheBackend, PutOptions};
use crate::error::CacheResult;
use crate::validate::PayloadSchema;

// == Noop Cache ==
/// Backend that stores nothing.
#[derive(Debug, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Creates a new NoopCache.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for NoopCache {
    async fn get(
        &self,
        _key: &str,
        _validator: Option<&dyn PayloadSchema>,
    ) -> CacheResult<Option<Value>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: Value, _options: PutOptions) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _tags: &[String]) -> CacheResult<usize> {
        Ok(0)
    }

    async fn clear(&self) -> CacheResult<()> {
        Ok(())
    }
}
