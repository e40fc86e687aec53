//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from the
//! in-process cache backend. Expiry is enforced on every read regardless;
//! the sweep only bounds the memory held by entries nobody asks for.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryCache;

/// Spawns the periodic expiry sweep for an in-process backend.
///
/// The task sleeps for the configured interval between runs and purges
/// expired entries each time it wakes.
///
/// # Arguments
/// * `cache` - Shared in-process backend to sweep
/// * `sweep_interval_secs` - Interval in seconds between runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
pub fn spawn_sweep_task(cache: Arc<MemoryCache>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting cache expiry sweep with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired().await;

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
