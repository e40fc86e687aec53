//! Result contract for pipeline-wrapped operations
//!
//! Every wrapped call resolves to `OpResult`: either a success envelope
//! carrying the value plus its observability metadata, or a typed `OpError`.
//! An envelope is constructed once per call and never mutated afterwards.

use serde::Serialize;
use serde_json::Value;

use crate::error::OpError;

// == Cache Meta ==
/// Cache observability attached to a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheMeta {
    /// True iff the value originated from the cache backend rather than
    /// from executing the underlying operation
    pub hit: bool,
    /// Cache key used for this call; empty when the call was not cacheable
    pub key: String,
}

impl CacheMeta {
    /// Meta for a call that bypassed the cache entirely.
    pub fn bypass() -> Self {
        Self {
            hit: false,
            key: String::new(),
        }
    }
}

// == Meta ==
/// Observability envelope on a successful result.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    /// Cache hit/key information
    pub cache: CacheMeta,
}

impl Meta {
    /// Builds the envelope for a given cache outcome.
    pub fn with_cache(hit: bool, key: impl Into<String>) -> Self {
        Self {
            cache: CacheMeta {
                hit,
                key: key.into(),
            },
        }
    }

    /// Envelope for calls that never touched the cache.
    pub fn uncached() -> Self {
        Self {
            cache: CacheMeta::bypass(),
        }
    }
}

// == Success Envelope ==
/// Successful outcome of a wrapped operation.
#[derive(Debug, Clone, Serialize)]
pub struct OpSuccess {
    /// The operation's (validated) output value
    pub value: Value,
    /// Observability metadata
    pub meta: Meta,
}

impl OpSuccess {
    /// Creates a success envelope.
    pub fn new(value: Value, meta: Meta) -> Self {
        Self { value, meta }
    }
}

// == Result Type Alias ==
/// Outcome of every pipeline-wrapped call.
pub type OpResult = std::result::Result<OpSuccess, OpError>;
