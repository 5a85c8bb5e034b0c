//! Caching Service
//!
//! Get-or-compute façade over one [`LruCache`] per result category.
//!
//! # Example
//! ```no_run
//! use dump_cache::config::CacheConfig;
//! use dump_cache::models::ProcessInfo;
//! use dump_cache::service::CachingService;
//!
//! let service = CachingService::new(CacheConfig::default());
//!
//! // First call runs the plugin, later calls are served from the cache
//! // until the dump file changes.
//! let processes = service.processes("memory.dmp", || {
//!     Ok::<_, std::io::Error>(vec![ProcessInfo {
//!         pid: 4,
//!         ppid: 0,
//!         name: "System".to_string(),
//!         create_time: None,
//!         threads: 120,
//!     }])
//! })?;
//! assert_eq!(processes.len(), 1);
//! # Ok::<(), std::io::Error>(())
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CacheStatistics, Clock, LruCache, SystemClock};
use crate::config::CacheConfig;
use crate::models::{
    CommandLineInfo, DllInfo, MalwareDetection, NetworkConnectionInfo, ProcessInfo,
};
use crate::service::inflight::{Claim, InflightTable};
use crate::service::{fingerprint, is_sentinel, Category, CategoryResult};

// == Caching Service ==
/// Holds one cache per analysis category, all sharing a single configuration.
#[derive(Debug)]
pub struct CachingService {
    config: CacheConfig,
    pub(super) processes: LruCache<Vec<ProcessInfo>>,
    pub(super) command_lines: LruCache<Vec<CommandLineInfo>>,
    pub(super) dlls: LruCache<Vec<DllInfo>>,
    pub(super) networks: LruCache<Vec<NetworkConnectionInfo>>,
    pub(super) malware: LruCache<Vec<MalwareDetection>>,
    inflight: InflightTable,
}

impl CachingService {
    // == Constructor ==
    /// Creates a service whose caches use the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a service whose caches share the given clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            max_entries = config.max_entries,
            ttl_secs = config.ttl_secs,
            coalesce_misses = config.coalesce_misses,
            "creating analysis result caches"
        );

        let processes = category_cache(&config, Category::Processes, &clock);
        let command_lines = category_cache(&config, Category::CommandLines, &clock);
        let dlls = category_cache(&config, Category::Dlls, &clock);
        let networks = category_cache(&config, Category::Networks, &clock);
        let malware = category_cache(&config, Category::Malware, &clock);

        Self {
            config,
            processes,
            command_lines,
            dlls,
            networks,
            malware,
            inflight: InflightTable::default(),
        }
    }

    // == Get Or Compute ==
    /// Returns the cached result set for `artifact_path`, computing and
    /// storing it on a miss.
    ///
    /// The category is chosen by the record type `T`. `extra_key_parts` are
    /// appended to the key so that differently-filtered calls on one dump do
    /// not share an entry. Errors from `compute` are returned unchanged and
    /// nothing is cached for them.
    ///
    /// `compute` runs on the calling thread with no lock held.
    pub fn get_or_compute<T, E, F>(
        &self,
        artifact_path: impl AsRef<Path>,
        extra_key_parts: &[&str],
        compute: F,
    ) -> Result<Vec<T>, E>
    where
        T: CategoryResult,
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        let path = artifact_path.as_ref();
        let hash = fingerprint(path);
        let key = cache_key(T::CATEGORY, path, extra_key_parts);
        let cache = T::cache(self);

        if let Some(cached) = cache.get(&key, &hash) {
            debug!(category = %T::CATEGORY, key = %key, "serving cached result");
            return Ok(cached);
        }

        if is_sentinel(&hash) {
            // Nothing stable to validate against later, so never store
            debug!(
                category = %T::CATEGORY,
                path = %path.display(),
                fingerprint = %hash,
                "artifact metadata unavailable, computing without caching"
            );
            return compute();
        }

        if !self.config.coalesce_misses {
            return compute_and_store(cache, key, hash, compute);
        }

        match self.inflight.claim(&key) {
            Claim::Leader(guard) => {
                // A previous leader may have stored the value between our
                // lookup and the claim. The miss is already counted.
                if let Some(cached) = cache.peek(&key, &hash) {
                    return Ok(cached);
                }
                let result = compute_and_store(cache, key, hash, compute);
                drop(guard);
                result
            }
            Claim::Follower(slot) => {
                debug!(category = %T::CATEGORY, key = %key, "waiting for in-flight computation");
                slot.wait();
                if let Some(cached) = cache.peek(&key, &hash) {
                    return Ok(cached);
                }
                // The leader failed or the artifact changed meanwhile
                compute_and_store(cache, key, hash, compute)
            }
        }
    }

    // == Category Shortcuts ==
    /// Cached process listing for a dump.
    pub fn processes<E>(
        &self,
        dump_path: impl AsRef<Path>,
        compute: impl FnOnce() -> Result<Vec<ProcessInfo>, E>,
    ) -> Result<Vec<ProcessInfo>, E> {
        self.get_or_compute(dump_path, &[], compute)
    }

    /// Cached command lines for a dump.
    pub fn command_lines<E>(
        &self,
        dump_path: impl AsRef<Path>,
        compute: impl FnOnce() -> Result<Vec<CommandLineInfo>, E>,
    ) -> Result<Vec<CommandLineInfo>, E> {
        self.get_or_compute(dump_path, &[], compute)
    }

    /// Cached module listing for a dump, optionally restricted to one process.
    pub fn dlls<E>(
        &self,
        dump_path: impl AsRef<Path>,
        pid_filter: Option<u32>,
        compute: impl FnOnce() -> Result<Vec<DllInfo>, E>,
    ) -> Result<Vec<DllInfo>, E> {
        match pid_filter {
            Some(pid) => {
                let pid = pid.to_string();
                self.get_or_compute(dump_path, &[pid.as_str()], compute)
            }
            None => self.get_or_compute(dump_path, &[], compute),
        }
    }

    /// Cached network connections for a dump.
    pub fn network_connections<E>(
        &self,
        dump_path: impl AsRef<Path>,
        compute: impl FnOnce() -> Result<Vec<NetworkConnectionInfo>, E>,
    ) -> Result<Vec<NetworkConnectionInfo>, E> {
        self.get_or_compute(dump_path, &[], compute)
    }

    /// Cached malware findings for a dump.
    pub fn malware<E>(
        &self,
        dump_path: impl AsRef<Path>,
        compute: impl FnOnce() -> Result<Vec<MalwareDetection>, E>,
    ) -> Result<Vec<MalwareDetection>, E> {
        self.get_or_compute(dump_path, &[], compute)
    }

    // == Maintenance ==
    /// Empties every category cache. Statistics counters are kept.
    pub fn clear_all_caches(&self) {
        self.processes.clear();
        self.command_lines.clear();
        self.dlls.clear();
        self.networks.clear();
        self.malware.clear();
        info!("all analysis caches cleared");
    }

    /// Drops expired entries from every cache, returning how many went.
    pub fn purge_expired(&self) -> usize {
        self.processes.purge_expired()
            + self.command_lines.purge_expired()
            + self.dlls.purge_expired()
            + self.networks.purge_expired()
            + self.malware.purge_expired()
    }

    // == Statistics ==
    /// Statistics snapshot of one category cache.
    pub fn statistics(&self, category: Category) -> CacheStatistics {
        match category {
            Category::Processes => self.processes.statistics(),
            Category::CommandLines => self.command_lines.statistics(),
            Category::Dlls => self.dlls.statistics(),
            Category::Networks => self.networks.statistics(),
            Category::Malware => self.malware.statistics(),
        }
    }

    /// Statistics snapshots of every category cache.
    pub fn all_statistics(&self) -> BTreeMap<Category, CacheStatistics> {
        Category::ALL
            .into_iter()
            .map(|category| (category, self.statistics(category)))
            .collect()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

// == Helpers ==
/// Builds `"{category}:{path}"` followed by `":{part}"` for every extra part.
pub fn cache_key(category: Category, artifact_path: &Path, extra_key_parts: &[&str]) -> String {
    let mut key = format!("{}:{}", category.label(), artifact_path.display());
    for part in extra_key_parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

fn category_cache<T: Clone>(
    config: &CacheConfig,
    category: Category,
    clock: &Arc<dyn Clock>,
) -> LruCache<T> {
    LruCache::with_clock(config.clone(), category.label(), Arc::clone(clock))
}

fn compute_and_store<T, E, F>(
    cache: &LruCache<Vec<T>>,
    key: String,
    hash: String,
    compute: F,
) -> Result<Vec<T>, E>
where
    T: Clone,
    F: FnOnce() -> Result<Vec<T>, E>,
{
    let result = compute()?;
    debug!(cache = cache.name(), key = %key, records = result.len(), "caching computed result");
    cache.put(key, result.clone(), hash);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn dump_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn process(pid: u32, name: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            ppid: 0,
            name: name.to_string(),
            create_time: None,
            threads: 1,
        }
    }

    fn dll(pid: u32, name: &str) -> DllInfo {
        DllInfo {
            pid,
            process_name: "proc.exe".to_string(),
            base_address: 0x7ff0_0000,
            size: 4096,
            name: name.to_string(),
            path: format!("C:\\Windows\\System32\\{}", name),
        }
    }

    #[test]
    fn test_service_creation() {
        let service = CachingService::new(CacheConfig::default());
        let stats = service.all_statistics();

        assert_eq!(stats.len(), 5);
        for stat in stats.values() {
            assert_eq!(stat.entries_count, 0);
            assert_eq!(stat.max_entries, 20);
        }
    }

    #[test]
    fn test_cache_key_format() {
        let path = Path::new("a.dmp");
        assert_eq!(cache_key(Category::Processes, path, &[]), "Processes:a.dmp");
        assert_eq!(cache_key(Category::Dlls, path, &["42"]), "DLLs:a.dmp:42");
        assert_eq!(
            cache_key(Category::Dlls, path, &["42", "x"]),
            "DLLs:a.dmp:42:x"
        );
    }

    #[test]
    fn test_second_call_served_from_cache() {
        let dump = dump_file(b"dump contents");
        let service = CachingService::new(CacheConfig::default());
        let calls = AtomicUsize::new(0);

        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(vec![process(4, "System")])
        };

        let first = service.processes(dump.path(), compute).unwrap();
        let second = service.processes(dump.path(), compute).unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = service.statistics(Category::Processes);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
    }

    #[test]
    fn test_compute_error_is_not_cached() {
        let dump = dump_file(b"dump");
        let service = CachingService::new(CacheConfig::default());

        let err = service
            .command_lines(dump.path(), || Err::<Vec<CommandLineInfo>, _>("plugin failed"))
            .unwrap_err();
        assert_eq!(err, "plugin failed");
        assert_eq!(service.statistics(Category::CommandLines).entries_count, 0);

        let ok = service
            .command_lines(dump.path(), || Ok::<_, &str>(Vec::new()))
            .unwrap();
        assert!(ok.is_empty());
        assert_eq!(service.statistics(Category::CommandLines).entries_count, 1);
    }

    #[test]
    fn test_missing_artifact_is_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.dmp");
        let service = CachingService::new(CacheConfig::default());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            service
                .malware(&missing, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(Vec::new())
                })
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(service.statistics(Category::Malware).entries_count, 0);
    }

    #[test]
    fn test_pid_filter_gets_its_own_entry() {
        let dump = dump_file(b"dump");
        let service = CachingService::new(CacheConfig::default());

        let all = service
            .dlls(dump.path(), None, || Ok::<_, ()>(vec![dll(1, "a.dll"), dll(2, "b.dll")]))
            .unwrap();
        let one = service
            .dlls(dump.path(), Some(2), || Ok::<_, ()>(vec![dll(2, "b.dll")]))
            .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(one.len(), 1);
        assert_eq!(service.statistics(Category::Dlls).entries_count, 2);
    }

    #[test]
    fn test_categories_are_isolated() {
        let dump = dump_file(b"dump");
        let service = CachingService::new(CacheConfig::default());

        service.processes(dump.path(), || Ok::<_, ()>(vec![process(1, "a")])).unwrap();
        service
            .network_connections(dump.path(), || Ok::<_, ()>(Vec::new()))
            .unwrap();

        let stats = service.all_statistics();
        assert_eq!(stats[&Category::Processes].entries_count, 1);
        assert_eq!(stats[&Category::Networks].entries_count, 1);
        assert_eq!(stats[&Category::Malware].entries_count, 0);
    }

    #[test]
    fn test_clear_all_caches() {
        let dump = dump_file(b"dump");
        let service = CachingService::new(CacheConfig::default());

        service.processes(dump.path(), || Ok::<_, ()>(vec![process(1, "a")])).unwrap();
        service.malware(dump.path(), || Ok::<_, ()>(Vec::new())).unwrap();
        service.clear_all_caches();

        for stat in service.all_statistics().values() {
            assert_eq!(stat.entries_count, 0);
        }
        // Counters survive a clear
        assert_eq!(service.statistics(Category::Processes).cache_misses, 1);
    }

    #[test]
    fn test_ttl_expiry_recomputes() {
        let dump = dump_file(b"dump");
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = CacheConfig {
            ttl_secs: 60,
            ..CacheConfig::default()
        };
        let service = CachingService::with_clock(config, clock.clone());
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(vec![process(1, "a")])
        };

        service.processes(dump.path(), compute).unwrap();
        clock.advance_secs(60);
        service.processes(dump.path(), compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance_secs(1);
        service.processes(dump.path(), compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_purge_expired_across_categories() {
        let dump = dump_file(b"dump");
        let clock = Arc::new(ManualClock::new(0));
        let config = CacheConfig {
            ttl_secs: 10,
            ..CacheConfig::default()
        };
        let service = CachingService::with_clock(config, clock.clone());

        service.processes(dump.path(), || Ok::<_, ()>(Vec::new())).unwrap();
        service.malware(dump.path(), || Ok::<_, ()>(Vec::new())).unwrap();
        clock.advance_secs(11);

        assert_eq!(service.purge_expired(), 2);
    }

    #[test]
    fn test_coalesced_misses_compute_once() {
        let dump = dump_file(b"dump");
        let service = Arc::new(CachingService::new(CacheConfig {
            coalesce_misses: true,
            ..CacheConfig::default()
        }));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));
        let path = dump.path().to_path_buf();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                let path = path.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service
                        .processes(&path, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(100));
                            Ok::<_, ()>(vec![process(4, "System")])
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Each call is counted once, waiting or not
        let stats = service.statistics(Category::Processes);
        assert_eq!(stats.cache_hits + stats.cache_misses, 4);
        assert!(stats.cache_misses >= 1);
    }

    #[test]
    fn test_coalesced_follower_recomputes_after_leader_failure() {
        let dump = dump_file(b"dump");
        let service = Arc::new(CachingService::new(CacheConfig {
            coalesce_misses: true,
            ..CacheConfig::default()
        }));
        let path = dump.path().to_path_buf();
        let started = Arc::new(Barrier::new(2));

        let leader = {
            let service = Arc::clone(&service);
            let started = Arc::clone(&started);
            let path = path.clone();
            thread::spawn(move || {
                service.processes(&path, || {
                    started.wait();
                    thread::sleep(Duration::from_millis(100));
                    Err::<Vec<ProcessInfo>, _>("boom")
                })
            })
        };

        started.wait();
        let follower = service.processes(&path, || Ok::<_, &str>(vec![process(1, "a")]));

        assert_eq!(leader.join().unwrap(), Err("boom"));
        assert_eq!(follower.unwrap().len(), 1);

        let stats = service.statistics(Category::Processes);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 2);
    }
}
