//! Expiry Sweeper
//!
//! Background task that periodically purges expired analysis results so
//! that stale entries do not sit in memory until their key is read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::service::CachingService;

/// Spawns a background task that periodically purges expired entries from
/// every category cache.
///
/// # Arguments
/// * `caching` - Shared caching service
/// * `cleanup_interval_secs` - Interval in seconds between sweeps (at least 1)
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let caching = Arc::new(CachingService::new(CacheConfig::default()));
/// let cleanup_handle = spawn_cleanup_task(caching.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    caching: Arc<CachingService>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval_secs = cleanup_interval_secs.max(1);
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "starting expiry sweeper");

        loop {
            tokio::time::sleep(interval).await;

            let removed = caching.purge_expired();

            if removed > 0 {
                info!(removed, "expiry sweep removed entries");
            } else {
                debug!("expiry sweep found nothing to remove");
            }
        }
    })
}
