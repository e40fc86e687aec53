//! Interception Pipeline Module
//!
//! Composes validation, cache lookup/population, execution of the
//! underlying provider operation, and instrumentation into one
//! deterministic sequence. Operations are wrapped at construction time
//! (`Pipeline::wrap`) instead of being discovered at runtime; the wrapped
//! handle is what callers invoke.

pub mod context;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::cache::{backend_from_config, CacheBackend, MemoryCache, PutOptions};
use crate::config::PipelineConfig;
use crate::error::OpError;
use crate::result::{Meta, OpResult, OpSuccess};
use crate::strategy::{CacheStrategy, DefaultStrategy};
use crate::telemetry::{CacheStatus, InstrumentationSink, NoopSink, OpStatus, PipelineMetrics};
use crate::validate::{check_input, check_output, PayloadSchema};

pub use context::{OpContext, OpIdentity, OpKind};

// == Operation Trait ==
/// The underlying provider operation the pipeline calls on a cache miss.
///
/// Adapters speak `Result`: a typed `OpError` is propagated to the caller
/// as-is, and `OpError::Generic` is the catch-all for unexpected adapter
/// failures.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Executes the operation against the back-end platform.
    async fn execute(&self, input: Value, ctx: &OpContext) -> Result<Value, OpError>;
}

// == Closure Adapter ==
/// Adapts an async closure into an [`Operation`].
pub struct FnOperation<F> {
    f: F,
}

impl<F> FnOperation<F> {
    /// Wraps a closure `(input, ctx) -> future of Result<Value, OpError>`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn(Value, OpContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, OpError>> + Send,
{
    async fn execute(&self, input: Value, ctx: &OpContext) -> Result<Value, OpError> {
        (self.f)(input, ctx.clone()).await
    }
}

// == Operation Policy ==
/// Per-operation wiring: identity plus the schemas guarding each slot.
///
/// A missing schema leaves that slot unvalidated.
pub struct OpPolicy {
    /// Logical identity of the wrapped operation
    pub identity: OpIdentity,
    /// Schema applied to the input before anything else happens
    pub input_schema: Option<Arc<dyn PayloadSchema>>,
    /// Schema applied to the output, fresh or cached, before returning
    pub output_schema: Option<Arc<dyn PayloadSchema>>,
}

impl OpPolicy {
    /// Policy with no schemas attached.
    pub fn new(identity: OpIdentity) -> Self {
        Self {
            identity,
            input_schema: None,
            output_schema: None,
        }
    }

    /// Attaches the input-slot schema.
    pub fn with_input_schema(mut self, schema: Arc<dyn PayloadSchema>) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Attaches the output-slot schema.
    pub fn with_output_schema(mut self, schema: Arc<dyn PayloadSchema>) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

// == Pipeline ==
/// The interception orchestrator.
///
/// One instance is shared by every wrapped operation of a process. All
/// collaborators are constructor-injected; nothing global.
///
/// Concurrency contract: each invocation is an independent task and the
/// pipeline holds no cross-invocation lock. There is no request coalescing:
/// two concurrent calls with the same cache key may both miss, both execute
/// and both write (last-write-wins on the backend). This race is accepted -
/// every read is validated and a miss falls back to fresh execution. A
/// mutation's invalidation and a concurrently in-flight read's population
/// are likewise unordered, leaving a narrow window in which a just
/// invalidated key is repopulated with pre-mutation data for one TTL.
///
/// Cloning is cheap: clones share the collaborators and the counters.
#[derive(Clone)]
pub struct Pipeline {
    cache: Arc<dyn CacheBackend>,
    strategy: Arc<dyn CacheStrategy>,
    sink: Arc<dyn InstrumentationSink>,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    /// Starts building a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Pipeline wired from configuration: backend selection and default
    /// strategy follow the config, instrumentation stays no-op.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Pipeline::builder()
            .cache(backend_from_config(config))
            .strategy(Arc::new(DefaultStrategy::from_config(config)))
            .build()
    }

    /// Process-wide invocation counters.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    // == Wrap ==
    /// Composes the pipeline around one operation.
    ///
    /// The returned handle is the only way callers reach the operation;
    /// every `call` runs the full interception sequence.
    pub fn wrap(&self, policy: OpPolicy, op: Arc<dyn Operation>) -> WrappedOp {
        WrappedOp {
            pipeline: self.clone(),
            policy,
            op,
        }
    }

    /// Convenience for wrapping an async closure.
    pub fn wrap_fn<F, Fut>(&self, policy: OpPolicy, f: F) -> WrappedOp
    where
        F: Fn(Value, OpContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, OpError>> + Send + 'static,
    {
        self.wrap(policy, Arc::new(FnOperation::new(f)))
    }

    // == Query Path ==
    /// Validate input, consult the cache, execute on miss, validate output,
    /// populate on a fresh cacheable success.
    async fn run_query(
        &self,
        policy: &OpPolicy,
        op: &dyn Operation,
        input: Value,
        ctx: &OpContext,
    ) -> (OpResult, CacheStatus) {
        // Validation precedes any cache interaction
        if let Err(err) = check_input(policy.input_schema.as_deref(), &input) {
            return (Err(err), CacheStatus::Bypass);
        }

        let eval = self.strategy.evaluate(&policy.identity, &input, ctx);

        let mut cache_status = CacheStatus::Bypass;
        if eval.can_cache {
            match self.cache.get(&eval.key, None).await {
                Ok(Some(cached)) => {
                    // A hit is not exempt from output validation: cached
                    // data can be stale relative to an evolved schema
                    if let Err(err) = check_output(policy.output_schema.as_deref(), &cached) {
                        return (Err(err), CacheStatus::Hit);
                    }
                    let success = OpSuccess::new(cached, Meta::with_cache(true, eval.key.clone()));
                    return (Ok(success), CacheStatus::Hit);
                }
                Ok(None) => {
                    cache_status = CacheStatus::Miss;
                }
                Err(err) => {
                    // A cache outage degrades to fresh execution
                    warn!(
                        operation = %policy.identity.qualified_name(),
                        key = %eval.key,
                        error = %err,
                        "cache lookup failed, treating as miss"
                    );
                    cache_status = CacheStatus::Miss;
                }
            }
        }

        let value = match op.execute(input, ctx).await {
            Ok(value) => value,
            Err(err) => return (Err(err), cache_status),
        };

        if let Err(err) = check_output(policy.output_schema.as_deref(), &value) {
            return (Err(err), cache_status);
        }

        // Populate only on a fresh, successful, cacheable execution
        if eval.can_cache && eval.ttl_seconds > 0 {
            let options = PutOptions::new(eval.ttl_seconds, eval.dependency_tags.clone());
            if let Err(err) = self.cache.put(&eval.key, value.clone(), options).await {
                warn!(
                    operation = %policy.identity.qualified_name(),
                    key = %eval.key,
                    error = %err,
                    "cache population failed, result unaffected"
                );
            }
        }

        let success = OpSuccess::new(value, Meta::with_cache(false, eval.key.clone()));
        (Ok(success), cache_status)
    }

    // == Mutation Path ==
    /// Validate input, execute, validate output, then invalidate the tags
    /// the state change touched. Invalidation never runs before a validated
    /// success and each tag is attempted independently.
    async fn run_mutation(
        &self,
        policy: &OpPolicy,
        op: &dyn Operation,
        input: Value,
        ctx: &OpContext,
    ) -> (OpResult, CacheStatus) {
        if let Err(err) = check_input(policy.input_schema.as_deref(), &input) {
            return (Err(err), CacheStatus::Bypass);
        }

        let tags = self.strategy.dependency_tags(&policy.identity, &input, ctx);

        let value = match op.execute(input, ctx).await {
            Ok(value) => value,
            Err(err) => return (Err(err), CacheStatus::Bypass),
        };

        if let Err(err) = check_output(policy.output_schema.as_deref(), &value) {
            return (Err(err), CacheStatus::Bypass);
        }

        for tag in &tags {
            if let Err(err) = self
                .cache
                .invalidate(std::slice::from_ref(tag))
                .await
            {
                warn!(
                    operation = %policy.identity.qualified_name(),
                    tag = %tag,
                    error = %err,
                    "invalidation failed for tag, continuing with the rest"
                );
            }
        }

        let success = OpSuccess::new(value, Meta::uncached());
        (Ok(success), CacheStatus::Bypass)
    }
}

// == Pipeline Builder ==
/// Assembles a pipeline from injected collaborators, with defaults for the
/// ones not supplied.
#[derive(Default)]
pub struct PipelineBuilder {
    cache: Option<Arc<dyn CacheBackend>>,
    strategy: Option<Arc<dyn CacheStrategy>>,
    sink: Option<Arc<dyn InstrumentationSink>>,
}

impl PipelineBuilder {
    /// Sets the cache backend (default: in-process, 1000 entries).
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the evaluation strategy (default: `DefaultStrategy`, 300s TTL).
    pub fn strategy(mut self, strategy: Arc<dyn CacheStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Sets the instrumentation sink (default: no-op).
    pub fn sink(mut self, sink: Arc<dyn InstrumentationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Finishes the pipeline.
    pub fn build(self) -> Pipeline {
        Pipeline {
            cache: self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new(1000))),
            strategy: self
                .strategy
                .unwrap_or_else(|| Arc::new(DefaultStrategy::new(300))),
            sink: self.sink.unwrap_or_else(|| Arc::new(NoopSink)),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }
}

// == Wrapped Operation ==
/// An operation composed with the pipeline; the caller-facing handle.
pub struct WrappedOp {
    pipeline: Pipeline,
    policy: OpPolicy,
    op: Arc<dyn Operation>,
}

impl WrappedOp {
    /// Identity of the wrapped operation.
    pub fn identity(&self) -> &OpIdentity {
        &self.policy.identity
    }

    // == Call ==
    /// Runs one invocation through the full interception sequence.
    ///
    /// The terminal instrumentation step fires exactly once per invocation,
    /// whichever path the call takes.
    pub async fn call(&self, input: Value, ctx: &OpContext) -> OpResult {
        self.pipeline.metrics.record_start();
        self.pipeline.sink.on_start(&self.policy.identity);
        let started = Instant::now();

        let (result, cache_status) = match self.policy.identity.kind {
            OpKind::Query => {
                self.pipeline
                    .run_query(&self.policy, self.op.as_ref(), input, ctx)
                    .await
            }
            OpKind::Mutation => {
                self.pipeline
                    .run_mutation(&self.policy, self.op.as_ref(), input, ctx)
                    .await
            }
        };

        let status = OpStatus::from_result(&result);
        self.pipeline.metrics.record_finish(status, cache_status);
        self.pipeline.sink.on_finish(
            &self.policy.identity,
            started.elapsed(),
            status,
            cache_status,
        );
        result
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counting_fetch(calls: Arc<AtomicU64>) -> Arc<dyn Operation> {
        Arc::new(FnOperation::new(move |input: Value, _ctx: OpContext| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"echo": input}))
            }
        }))
    }

    #[tokio::test]
    async fn test_query_miss_then_hit() {
        let pipeline = Pipeline::builder().build();
        let calls = Arc::new(AtomicU64::new(0));
        let op = pipeline.wrap(
            OpPolicy::new(OpIdentity::query("test", "product", "get")),
            counting_fetch(Arc::clone(&calls)),
        );
        let ctx = OpContext::default();

        let first = op.call(json!({"sku": "a"}), &ctx).await.unwrap();
        assert!(!first.meta.cache.hit);

        let second = op.call(json!({"sku": "a"}), &ctx).await.unwrap();
        assert!(second.meta.cache.hit);
        assert_eq!(second.value, first.value);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_inputs_do_not_share_entries() {
        let pipeline = Pipeline::builder().build();
        let calls = Arc::new(AtomicU64::new(0));
        let op = pipeline.wrap(
            OpPolicy::new(OpIdentity::query("test", "product", "get")),
            counting_fetch(Arc::clone(&calls)),
        );
        let ctx = OpContext::default();

        op.call(json!({"sku": "a"}), &ctx).await.unwrap();
        op.call(json!({"sku": "b"}), &ctx).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_input_short_circuits_before_execution() {
        let pipeline = Pipeline::builder().build();
        let calls = Arc::new(AtomicU64::new(0));
        let schema = crate::validate::SchemaFn::object_with("input", &["sku"]);
        let op = pipeline.wrap(
            OpPolicy::new(OpIdentity::query("test", "product", "get"))
                .with_input_schema(Arc::new(schema)),
            counting_fetch(Arc::clone(&calls)),
        );

        let result = op.call(json!({"wrong": 1}), &OpContext::default()).await;

        assert!(matches!(result, Err(OpError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_output_of_fresh_execution() {
        let pipeline = Pipeline::builder().build();
        let schema = crate::validate::SchemaFn::object_with("output", &["price"]);
        let op = pipeline.wrap_fn(
            OpPolicy::new(OpIdentity::query("test", "product", "get"))
                .with_output_schema(Arc::new(schema)),
            |_input, _ctx| async { Ok(json!({"sku": "a"})) },
        );

        let result = op.call(json!({}), &OpContext::default()).await;
        assert!(matches!(result, Err(OpError::InvalidOutput(_))));
    }

    #[tokio::test]
    async fn test_typed_operation_error_propagates() {
        let pipeline = Pipeline::builder().build();
        let op = pipeline.wrap_fn(
            OpPolicy::new(OpIdentity::query("test", "product", "get")),
            |_input, _ctx| async { Err(OpError::NotFound("sku-9".to_string())) },
        );

        let result = op.call(json!({}), &OpContext::default()).await;
        assert!(matches!(result, Err(OpError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mutation_invalidates_scope_entries() {
        let pipeline = Pipeline::builder().build();
        let ctx = OpContext::default();
        let calls = Arc::new(AtomicU64::new(0));

        let read = pipeline.wrap(
            OpPolicy::new(OpIdentity::query("test", "product", "get")),
            counting_fetch(Arc::clone(&calls)),
        );
        let write = pipeline.wrap_fn(
            OpPolicy::new(OpIdentity::mutation("test", "product", "update")),
            |_input, _ctx| async { Ok(json!({"ok": true})) },
        );

        read.call(json!({"sku": "a"}), &ctx).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mutated = write.call(json!({"sku": "a"}), &ctx).await.unwrap();
        assert!(!mutated.meta.cache.hit);

        // The read's entry was registered under product:* and is now gone
        let after = read.call(json!({"sku": "a"}), &ctx).await.unwrap();
        assert!(!after.meta.cache.hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_metrics_observe_hits_and_misses() {
        let pipeline = Pipeline::builder().build();
        let calls = Arc::new(AtomicU64::new(0));
        let op = pipeline.wrap(
            OpPolicy::new(OpIdentity::query("test", "product", "get")),
            counting_fetch(calls),
        );
        let ctx = OpContext::default();

        op.call(json!({"sku": "a"}), &ctx).await.unwrap();
        op.call(json!({"sku": "a"}), &ctx).await.unwrap();

        let snap = pipeline.metrics().snapshot();
        assert_eq!(snap.started, 2);
        assert_eq!(snap.in_flight, 0);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 1);
    }
}
