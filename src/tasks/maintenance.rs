//! Cache Maintenance Task
//!
//! Background task that periodically removes expired entries and evicts down
//! to the weight bound.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns a background task that periodically runs cache maintenance.
///
/// The task loops forever, sleeping for `interval` between passes. Each pass
/// locks one shard at a time, so callers are never blocked for longer than a
/// single shard sweep.
///
/// # Returns
/// A JoinHandle for the spawned task; abort it to stop maintenance.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(reference_cache(true)?);
/// let maintenance = spawn_maintenance_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// maintenance.abort();
/// ```
pub fn spawn_maintenance_task<K, V>(cache: Arc<Cache<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting cache maintenance task with interval of {:?}",
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let pass = cache.run_pending_tasks();

            if pass.expired > 0 || pass.evicted > 0 {
                info!(
                    expired = pass.expired,
                    evicted = pass.evicted,
                    "Cache maintenance removed entries"
                );
            } else {
                debug!("Cache maintenance: nothing to remove");
            }
        }
    })
}
