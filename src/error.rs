//! Error types for the interception pipeline
//!
//! Provides unified error handling using thiserror. Two families exist:
//! `OpError` flows back to callers of wrapped operations, while `CacheError`
//! is confined to cache backends and is always recovered by the pipeline.

use thiserror::Error;

use crate::validate::SchemaViolation;

// == Operation Error Enum ==
/// Caller-facing error for a pipeline-wrapped operation.
///
/// Every wrapped call resolves to either a success envelope or exactly one
/// of these variants. No other failure shape crosses the pipeline boundary.
#[derive(Error, Debug)]
pub enum OpError {
    /// Input failed schema validation before execution
    #[error("invalid input: {0}")]
    InvalidInput(SchemaViolation),

    /// The underlying operation (or a cache hit) produced a value that does
    /// not match the declared output shape. Signals an adapter bug rather
    /// than a caller error.
    #[error("invalid output: {0}")]
    InvalidOutput(SchemaViolation),

    /// Domain-level absence raised by the underlying operation
    #[error("not found: {0}")]
    NotFound(String),

    /// Unexpected failure from the underlying operation. The display form is
    /// redacted; the detail stays on the variant for logging.
    #[error("internal error")]
    Generic {
        /// Original failure description, never shown to callers
        detail: String,
    },
}

impl OpError {
    // == Generic Constructor ==
    /// Wraps an arbitrary adapter failure, keeping its description out of
    /// the caller-facing message.
    pub fn generic(detail: impl Into<String>) -> Self {
        OpError::Generic {
            detail: detail.into(),
        }
    }

    /// Short machine-readable name of the variant, used as an
    /// instrumentation attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            OpError::InvalidInput(_) => "invalid_input",
            OpError::InvalidOutput(_) => "invalid_output",
            OpError::NotFound(_) => "not_found",
            OpError::Generic { .. } => "generic",
        }
    }
}

// == Cache Error Enum ==
/// Failure inside a cache backend.
///
/// These never reach callers of wrapped operations: the pipeline logs them
/// and degrades to fresh execution.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend store is unreachable or misbehaving
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A stored payload could not be encoded or decoded
    #[error("cache codec error: {0}")]
    Codec(String),

    /// The entry was refused by the backend (oversized key or value)
    #[error("cache entry rejected: {0}")]
    Rejected(String),
}

// == Result Type Aliases ==
/// Convenience Result type for cache backend operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_display_is_redacted() {
        let err = OpError::generic("connection reset by platform xyz");
        assert_eq!(err.to_string(), "internal error");

        // Detail remains reachable for logging
        if let OpError::Generic { detail } = err {
            assert!(detail.contains("platform xyz"));
        } else {
            panic!("expected Generic variant");
        }
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(OpError::NotFound("sku".into()).kind(), "not_found");
        assert_eq!(OpError::generic("x").kind(), "generic");
        assert_eq!(
            OpError::InvalidInput(SchemaViolation::new("key", "missing")).kind(),
            "invalid_input"
        );
        assert_eq!(
            OpError::InvalidOutput(SchemaViolation::new("key", "missing")).kind(),
            "invalid_output"
        );
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::Backend("refused".to_string());
        assert!(err.to_string().contains("refused"));
    }
}
