//! Storefront Pipeline - a normalization layer over commerce back-ends
//!
//! Wraps provider queries and mutations with schema validation, a pluggable
//! caching strategy with tag-based invalidation, and instrumentation, behind
//! a uniform success/error result contract.

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod result;
pub mod strategy;
pub mod tasks;
pub mod telemetry;
pub mod validate;

pub use cache::{backend_from_config, CacheBackend, HttpCache, MemoryCache, NoopCache, PutOptions};
pub use config::PipelineConfig;
pub use error::{CacheError, OpError};
pub use pipeline::{
    FnOperation, OpContext, OpIdentity, OpKind, OpPolicy, Operation, Pipeline, WrappedOp,
};
pub use registry::{Client, ClientBuilder, RegistryError};
pub use result::{CacheMeta, Meta, OpResult, OpSuccess};
pub use strategy::{CacheEvaluation, CacheStrategy, DefaultStrategy};
pub use tasks::spawn_sweep_task;
pub use telemetry::{CacheStatus, InstrumentationSink, NoopSink, PipelineMetrics, TracingSink};
pub use validate::{PayloadSchema, SchemaFn, SchemaViolation};
