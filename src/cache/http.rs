//! Remote Cache Backend
//!
//! Client for an HTTP key/value cache service. The service owns persistence
//! and sharing across processes; this backend only speaks its protocol:
//!
//! - `PUT /set` - store an entry with TTL and dependency tags
//! - `GET /get/:key` - fetch an entry (404 = absent)
//! - `DELETE /del/:key` - drop a single entry
//! - `POST /invalidate` - remove entries by dependency tag
//! - `POST /clear` - remove everything
//!
//! The request timeout lives here, not in the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheBackend, PutOptions};
use crate::error::{CacheError, CacheResult};
use crate::validate::PayloadSchema;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

// == Wire DTOs ==
/// Body for `PUT /set`.
#[derive(Debug, Serialize)]
struct StoreRequest<'a> {
    key: &'a str,
    value: &'a Value,
    ttl: u64,
    tags: &'a [String],
}

/// Body of a successful `GET /get/:key`.
#[derive(Debug, Deserialize)]
struct FetchResponse {
    value: Value,
}

/// Body for `POST /invalidate`.
#[derive(Debug, Serialize)]
struct InvalidateRequest<'a> {
    tags: &'a [String],
}

/// Body of a successful `POST /invalidate`.
#[derive(Debug, Deserialize)]
struct InvalidateResponse {
    removed: usize,
}

// == Http Cache ==
/// Cache backend delegating to a remote key/value service.
#[derive(Debug, Clone)]
pub struct HttpCache {
    base_url: String,
    http: reqwest::Client,
}

impl HttpCache {
    // == Constructor ==
    /// Creates a client for the service at `base_url` with the default
    /// request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { base_url, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Best-effort removal of a single entry; used when a stored value fails
    /// the caller's shape contract.
    async fn drop_entry(&self, key: &str) {
        let result = self.http.delete(self.url(&format!("/del/{}", key))).send().await;
        if let Err(err) = result {
            debug!(key, error = %err, "failed to drop stale remote entry");
        }
    }
}

#[async_trait]
impl CacheBackend for HttpCache {
    async fn get(
        &self,
        key: &str,
        validator: Option<&dyn PayloadSchema>,
    ) -> CacheResult<Option<Value>> {
        let response = self
            .http
            .get(self.url(&format!("/get/{}", key)))
            .send()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        // Absence is a normal outcome, not an error
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CacheError::Backend(format!(
                "unexpected status {} from cache service",
                response.status()
            )));
        }

        let body: FetchResponse = response
            .json()
            .await
            .map_err(|e| CacheError::Codec(e.to_string()))?;

        if let Some(validator) = validator {
            if let Err(violation) = validator.validate(&body.value) {
                debug!(key, %violation, "dropping remote entry failing validation");
                self.drop_entry(key).await;
                return Ok(None);
            }
        }

        Ok(Some(body.value))
    }

    async fn put(&self, key: &str, value: Value, options: PutOptions) -> CacheResult<()> {
        if options.ttl_seconds == 0 {
            return Ok(());
        }

        let body = StoreRequest {
            key,
            value: &value,
            ttl: options.ttl_seconds,
            tags: &options.dependency_tags,
        };
        let response = self
            .http
            .put(self.url("/set"))
            .json(&body)
            .send()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CacheError::Backend(format!(
                "store rejected with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn invalidate(&self, tags: &[String]) -> CacheResult<usize> {
        let response = self
            .http
            .post(self.url("/invalidate"))
            .json(&InvalidateRequest { tags })
            .send()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CacheError::Backend(format!(
                "invalidation rejected with status {}",
                response.status()
            )));
        }

        let body: InvalidateResponse = response
            .json()
            .await
            .map_err(|e| CacheError::Codec(e.to_string()))?;
        Ok(body.removed)
    }

    async fn clear(&self) -> CacheResult<()> {
        let response = self
            .http
            .post(self.url("/clear"))
            .send()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CacheError::Backend(format!(
                "clear rejected with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
