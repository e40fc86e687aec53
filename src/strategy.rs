//! Cache Evaluation Strategy
//!
//! Per-operation cacheability decisions: whether a call may be served from
//! cache, under which key, for how long, and which dependency tags group it
//! for invalidation. Mutations additionally declare the tags they touch.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::PipelineConfig;
use crate::pipeline::{OpContext, OpIdentity, OpKind};

/// Digest length in hex characters; enough to keep distinct inputs apart
/// without bloating keys.
const DIGEST_LEN: usize = 16;

// == Cache Evaluation ==
/// Decision record produced per call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvaluation {
    /// Cache key; empty when the call is not cacheable
    pub key: String,
    /// Validity window in seconds; 0 means "do not persist"
    pub ttl_seconds: u64,
    /// When false the pipeline must not touch the cache for this call
    pub can_cache: bool,
    /// Tags the stored entry is registered under
    pub dependency_tags: Vec<String>,
}

impl CacheEvaluation {
    /// Evaluation for a call that bypasses the cache.
    pub fn skip() -> Self {
        Self {
            key: String::new(),
            ttl_seconds: 0,
            can_cache: false,
            dependency_tags: Vec::new(),
        }
    }

    /// Evaluation for a cacheable call.
    pub fn cacheable(key: impl Into<String>, ttl_seconds: u64, dependency_tags: Vec<String>) -> Self {
        Self {
            key: key.into(),
            ttl_seconds,
            can_cache: true,
            dependency_tags,
        }
    }
}

// == Strategy Trait ==
/// Per-operation cache policy.
///
/// `evaluate` runs before every call; `dependency_tags` runs after a
/// successful mutation to determine which cached entries the state change
/// made stale.
pub trait CacheStrategy: Send + Sync {
    /// Produces the cache decision for one call.
    fn evaluate(&self, identity: &OpIdentity, input: &Value, ctx: &OpContext) -> CacheEvaluation;

    /// Tags touched by a mutation's state change.
    fn dependency_tags(&self, identity: &OpIdentity, input: &Value, ctx: &OpContext)
        -> Vec<String>;
}

// == Default Strategy ==
/// Stock policy covering the common commerce shapes.
///
/// Queries are cacheable when caching is globally enabled and the scope is
/// not personalized; keys are `{scope}:{method}:{digest}` where the digest
/// covers the canonical input plus locale and currency. Mutations are never
/// cacheable and invalidate the wildcard tag of their scope.
pub struct DefaultStrategy {
    enabled: bool,
    default_ttl: u64,
    /// Per-scope TTL overrides
    ttl_overrides: HashMap<String, u64>,
    /// Scopes whose data is personalized or mutation-adjacent and must never
    /// be served stale (cart, checkout, customer by default)
    personalized_scopes: HashSet<String>,
}

impl DefaultStrategy {
    // == Constructors ==
    /// Strategy with the given default TTL and stock personalized scopes.
    pub fn new(default_ttl: u64) -> Self {
        let personalized_scopes = ["cart", "checkout", "customer"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            enabled: true,
            default_ttl,
            ttl_overrides: HashMap::new(),
            personalized_scopes,
        }
    }

    /// Strategy derived from configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut strategy = Self::new(config.default_ttl);
        strategy.enabled = config.cache_enabled;
        strategy
    }

    /// Overrides the TTL for one scope.
    pub fn with_ttl_override(mut self, scope: impl Into<String>, ttl_seconds: u64) -> Self {
        self.ttl_overrides.insert(scope.into(), ttl_seconds);
        self
    }

    /// Marks an additional scope as personalized (never cached).
    pub fn with_personalized_scope(mut self, scope: impl Into<String>) -> Self {
        self.personalized_scopes.insert(scope.into());
        self
    }

    // == Key Derivation ==
    /// Content digest of the canonical input and the context dimensions the
    /// result varies on. Deterministic: `serde_json` keeps object keys
    /// ordered, so equal values serialize identically.
    fn digest(input: &Value, ctx: &OpContext) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(ctx.locale.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"|");
        hasher.update(ctx.currency.as_deref().unwrap_or("").as_bytes());
        let full = hex::encode(hasher.finalize());
        full[..DIGEST_LEN].to_string()
    }

    /// Wildcard invalidation tag for a resource scope.
    fn wildcard_tag(scope: &str) -> String {
        format!("{}:*", scope)
    }
}

impl CacheStrategy for DefaultStrategy {
    fn evaluate(&self, identity: &OpIdentity, input: &Value, ctx: &OpContext) -> CacheEvaluation {
        if !self.enabled
            || identity.kind == OpKind::Mutation
            || self.personalized_scopes.contains(&identity.scope)
        {
            return CacheEvaluation::skip();
        }

        let key = format!(
            "{}:{}:{}",
            identity.scope,
            identity.method,
            Self::digest(input, ctx)
        );
        let ttl = self
            .ttl_overrides
            .get(&identity.scope)
            .copied()
            .unwrap_or(self.default_ttl);

        CacheEvaluation::cacheable(key, ttl, vec![Self::wildcard_tag(&identity.scope)])
    }

    fn dependency_tags(
        &self,
        identity: &OpIdentity,
        _input: &Value,
        _ctx: &OpContext,
    ) -> Vec<String> {
        vec![Self::wildcard_tag(&identity.scope)]
    }
}
