//! Configuration Module
//!
//! Handles loading pipeline configuration from environment variables.

use std::env;

/// Pipeline configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Global caching switch; when false the no-op backend is selected
    pub cache_enabled: bool,
    /// Default TTL in seconds for cacheable operations without an override
    pub default_ttl: u64,
    /// Maximum number of entries the in-process backend can hold
    pub max_entries: usize,
    /// Background expiry sweep interval in seconds
    pub sweep_interval: u64,
    /// Base URL of a remote cache service; unset selects the in-process backend
    pub cache_url: Option<String>,
}

impl PipelineConfig {
    /// Creates a new PipelineConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PIPELINE_CACHE_ENABLED` - Global caching switch (default: true)
    /// - `PIPELINE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `PIPELINE_MAX_ENTRIES` - Maximum in-process entries (default: 1000)
    /// - `PIPELINE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 30)
    /// - `PIPELINE_CACHE_URL` - Remote cache base URL (default: unset)
    pub fn from_env() -> Self {
        Self {
            cache_enabled: env::var("PIPELINE_CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            default_ttl: env::var("PIPELINE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            max_entries: env::var("PIPELINE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            sweep_interval: env::var("PIPELINE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            cache_url: env::var("PIPELINE_CACHE_URL").ok().filter(|v| !v.is_empty()),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            default_ttl: 300,
            max_entries: 1000,
            sweep_interval: 30,
            cache_url: None,
        }
    }
}
