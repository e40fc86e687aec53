//! Instrumentation Module
//!
//! Side-effecting observability for the pipeline: an injectable sink fired
//! at the start and end of every invocation, plus process-wide atomic
//! counters. Sinks never affect a call's outcome. There is no global tracer
//! state: whoever builds the pipeline supplies the sink, defaulting to the
//! no-op implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::OpError;
use crate::pipeline::OpIdentity;
use crate::result::OpResult;

// == Cache Status ==
/// How the cache participated in one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheStatus {
    /// Served from the cache backend
    Hit,
    /// Looked up but absent; the underlying operation executed
    Miss,
    /// Not cacheable; the cache was never consulted
    Bypass,
}

impl CacheStatus {
    /// Attribute value for logs and sinks.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
        }
    }
}

// == Operation Status ==
/// Final status of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpStatus {
    Success,
    InvalidInput,
    InvalidOutput,
    NotFound,
    Generic,
}

impl OpStatus {
    /// Derives the status from a finished call's result.
    pub fn from_result(result: &OpResult) -> Self {
        match result {
            Ok(_) => OpStatus::Success,
            Err(OpError::InvalidInput(_)) => OpStatus::InvalidInput,
            Err(OpError::InvalidOutput(_)) => OpStatus::InvalidOutput,
            Err(OpError::NotFound(_)) => OpStatus::NotFound,
            Err(OpError::Generic { .. }) => OpStatus::Generic,
        }
    }

    /// Attribute value for logs and sinks.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpStatus::Success => "success",
            OpStatus::InvalidInput => "invalid_input",
            OpStatus::InvalidOutput => "invalid_output",
            OpStatus::NotFound => "not_found",
            OpStatus::Generic => "generic",
        }
    }
}

// == Instrumentation Sink Trait ==
/// Receiver of per-invocation observability events.
///
/// Fire-and-forget: implementations must not panic and their work is never
/// awaited by the pipeline beyond the synchronous call itself.
pub trait InstrumentationSink: Send + Sync {
    /// Called once when an invocation enters the pipeline.
    fn on_start(&self, identity: &OpIdentity);

    /// Called exactly once when an invocation leaves the pipeline,
    /// regardless of which path it took.
    fn on_finish(
        &self,
        identity: &OpIdentity,
        duration: Duration,
        status: OpStatus,
        cache_status: CacheStatus,
    );
}

// == Noop Sink ==
/// Default sink: records nothing.
#[derive(Debug, Default)]
pub struct NoopSink;

impl InstrumentationSink for NoopSink {
    fn on_start(&self, _identity: &OpIdentity) {}

    fn on_finish(
        &self,
        _identity: &OpIdentity,
        _duration: Duration,
        _status: OpStatus,
        _cache_status: CacheStatus,
    ) {
    }
}

// == Tracing Sink ==
/// Sink emitting structured `tracing` events.
#[derive(Debug, Default)]
pub struct TracingSink;

impl InstrumentationSink for TracingSink {
    fn on_start(&self, identity: &OpIdentity) {
        debug!(operation = %identity.qualified_name(), "operation started");
    }

    fn on_finish(
        &self,
        identity: &OpIdentity,
        duration: Duration,
        status: OpStatus,
        cache_status: CacheStatus,
    ) {
        info!(
            operation = %identity.qualified_name(),
            duration_ms = duration.as_millis() as u64,
            status = status.as_str(),
            cache = cache_status.as_str(),
            "operation finished"
        );
    }
}

// == Pipeline Metrics ==
/// Process-wide counters, updated atomically by every invocation.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    started: AtomicU64,
    in_flight: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_bypasses: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub started: u64,
    pub in_flight: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_bypasses: u64,
    /// hits / (hits + misses); 0.0 when no cache-eligible call occurred
    pub hit_rate: f64,
}

impl PipelineMetrics {
    /// Creates metrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_finish(&self, status: OpStatus, cache_status: CacheStatus) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        match status {
            OpStatus::Success => self.succeeded.fetch_add(1, Ordering::Relaxed),
            _ => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        match cache_status {
            CacheStatus::Hit => self.cache_hits.fetch_add(1, Ordering::Relaxed),
            CacheStatus::Miss => self.cache_misses.fetch_add(1, Ordering::Relaxed),
            CacheStatus::Bypass => self.cache_bypasses.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Current number of invocations inside the pipeline.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    // == Hit Rate ==
    /// Cache hit rate across all finished invocations.
    ///
    /// Defined as 0.0 when no lookup has happened yet.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Copies all counters into a serializable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_bypasses: self.cache_bypasses.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
        }
    }
}
