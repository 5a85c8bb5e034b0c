//! Cache Invalidation Service
//!
//! Watches dump files and clears every analysis cache when one of them
//! changes. Also offers an explicit validation check and a manual trigger.
//!
//! Invalidation is coarse: any change to any watched file clears all
//! categories.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use notify::RecommendedWatcher;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::invalidation::event::{InvalidationEvent, Subscribers, SubscriptionId};
use crate::invalidation::file_hash::coarse_file_hash;
use crate::invalidation::watcher::{
    run_debounce_loop, subscribe_file, WatchSignal, DEFAULT_DEBOUNCE,
};
use crate::service::CachingService;

const CHANGED_ON_DISK: &str = "file changed on disk";
const CHANGED_SINCE_VALIDATION: &str = "file changed since last validation";

// == Watched File ==
struct WatchedFile {
    // Dropping the watcher ends the OS subscription
    _subscription: RecommendedWatcher,
    /// Coarse hash taken when the watch started or at the last failed validation
    hash: Option<u64>,
}

// == Shared State ==
/// State reachable from both the public handle and the debounce thread.
struct Shared {
    caching: Arc<CachingService>,
    watches: Mutex<HashMap<PathBuf, WatchedFile>>,
    subscribers: Subscribers,
}

impl Shared {
    /// Clears all caches, then notifies subscribers. No lock is held here.
    fn invalidate(&self, path: &Path, reason: &str) {
        self.caching.clear_all_caches();

        let event = InvalidationEvent::new(path, reason);
        info!(path = %path.display(), reason = %reason, "caches invalidated");
        self.subscribers.publish(&event);
    }

    /// Debounced change notification for `path`.
    fn handle_change(&self, path: &Path) {
        // The recorded hash is left alone; only validation moves it forward
        let watched = self.watches.lock().contains_key(path);

        if watched {
            self.invalidate(path, CHANGED_ON_DISK);
        } else {
            debug!(path = %path.display(), "ignoring change for unwatched file");
        }
    }
}

// == Cache Invalidation Service ==
/// Owns the file subscriptions and the debounce thread.
///
/// Dropping the service shuts it down.
pub struct CacheInvalidationService {
    shared: Arc<Shared>,
    signals: Sender<WatchSignal>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl CacheInvalidationService {
    // == Constructor ==
    /// Creates the service with the default debounce window.
    pub fn new(caching: Arc<CachingService>) -> io::Result<Self> {
        Self::with_debounce(caching, DEFAULT_DEBOUNCE)
    }

    /// Creates the service, starting its debounce thread.
    ///
    /// # Errors
    /// Fails only if the thread cannot be spawned.
    pub fn with_debounce(caching: Arc<CachingService>, debounce: Duration) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            caching,
            watches: Mutex::new(HashMap::new()),
            subscribers: Subscribers::default(),
        });
        let (signals, receiver) = crossbeam_channel::unbounded();

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("cache-invalidation".to_string())
            .spawn(move || {
                run_debounce_loop(receiver, debounce, |path| worker_shared.handle_change(path));
            })?;

        info!(debounce_ms = debounce.as_millis() as u64, "invalidation service started");

        Ok(Self {
            shared,
            signals,
            worker: Mutex::new(Some(worker)),
            shut_down: AtomicBool::new(false),
        })
    }

    // == Watch Management ==
    /// Starts watching `path`.
    ///
    /// Returns false without side effects if the file does not exist, is
    /// already watched, or the service has been shut down.
    pub fn watch_file(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();

        if self.is_shut_down() {
            warn!(path = %path.display(), "watch requested after shutdown");
            return false;
        }
        if !path.exists() {
            info!(path = %path.display(), "not watching missing file");
            return false;
        }

        let mut watches = self.shared.watches.lock();
        if watches.contains_key(path) {
            debug!(path = %path.display(), "file already watched");
            return false;
        }

        match subscribe_file(path, self.signals.clone()) {
            Ok(subscription) => {
                watches.insert(
                    path.to_path_buf(),
                    WatchedFile {
                        _subscription: subscription,
                        hash: coarse_file_hash(path),
                    },
                );
                info!(path = %path.display(), watched = watches.len(), "watching file");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to watch file");
                false
            }
        }
    }

    /// Stops watching `path`. Returns false if it was not watched.
    pub fn unwatch_file(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let removed = self.shared.watches.lock().remove(path);

        match removed {
            Some(_) => {
                info!(path = %path.display(), "stopped watching file");
                true
            }
            None => false,
        }
    }

    /// Releases every subscription.
    pub fn stop_watching_all(&self) {
        let drained: Vec<(PathBuf, WatchedFile)> = self.shared.watches.lock().drain().collect();
        if !drained.is_empty() {
            info!(count = drained.len(), "stopped watching all files");
        }
    }

    // == Invalidation ==
    /// Clears every cache unconditionally and raises an event for `path`.
    pub fn invalidate_for_file(&self, path: impl AsRef<Path>, reason: &str) {
        self.shared.invalidate(path.as_ref(), reason);
    }

    /// Checks a watched file against the hash recorded for it.
    ///
    /// Returns true if the file is unchanged or not watched. On a change the
    /// recorded hash is refreshed, all caches are cleared, an event is raised
    /// and false is returned.
    pub fn validate_cache_entry(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();

        {
            let mut watches = self.shared.watches.lock();
            let Some(file) = watches.get_mut(path) else {
                return true;
            };
            let current = coarse_file_hash(path);
            if current == file.hash {
                return true;
            }
            file.hash = current;
        }

        self.shared.invalidate(path, CHANGED_SINCE_VALIDATION);
        false
    }

    /// Feeds a change for `path` into the debounce window, as if the OS had
    /// reported it.
    pub fn report_change(&self, path: impl AsRef<Path>) {
        // Fails only once the debounce thread has exited
        let _ = self
            .signals
            .send(WatchSignal::Changed(path.as_ref().to_path_buf()));
    }

    // == Subscriptions ==
    /// Registers a callback invoked synchronously for every invalidation.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&InvalidationEvent) + Send + Sync + 'static,
    {
        self.shared.subscribers.add(Arc::new(callback))
    }

    /// Returns false if the subscription was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.remove(id)
    }

    // == Introspection ==
    /// Watched paths in sorted order.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.shared.watches.lock().keys().cloned().collect();
        files.sort();
        files
    }

    pub fn is_watching(&self, path: impl AsRef<Path>) -> bool {
        self.shared.watches.lock().contains_key(path.as_ref())
    }

    pub fn watch_count(&self) -> usize {
        self.shared.watches.lock().len()
    }

    pub fn caching(&self) -> &Arc<CachingService> {
        &self.shared.caching
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // == Shutdown ==
    /// Releases all subscriptions and stops the debounce thread.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.stop_watching_all();
        let _ = self.signals.send(WatchSignal::Shutdown);

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("invalidation worker panicked");
            }
        }
        info!("invalidation service shut down");
    }
}

impl Drop for CacheInvalidationService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CacheInvalidationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInvalidationService")
            .field("watched", &self.watch_count())
            .field("subscribers", &self.shared.subscribers)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::models::ProcessInfo;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tempfile::TempDir;

    fn process(pid: u32) -> ProcessInfo {
        ProcessInfo {
            pid,
            ppid: 0,
            name: format!("proc{pid}"),
            create_time: None,
            threads: 1,
        }
    }

    fn setup(debounce_ms: u64) -> (CacheInvalidationService, TempDir, PathBuf) {
        let caching = Arc::new(CachingService::new(CacheConfig::default()));
        let service =
            CacheInvalidationService::with_debounce(caching, Duration::from_millis(debounce_ms))
                .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.dmp");
        fs::write(&path, b"initial contents").unwrap();
        (service, dir, path)
    }

    fn counting_subscriber(service: &CacheInvalidationService) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        service.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn warm_cache(service: &CacheInvalidationService, path: &Path) {
        service
            .caching()
            .processes(path, || Ok::<_, ()>(vec![process(4)]))
            .unwrap();
        assert_eq!(
            service
                .caching()
                .statistics(crate::service::Category::Processes)
                .entries_count,
            1
        );
    }

    fn append(path: &Path, bytes: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
    }

    #[test]
    fn test_watch_and_unwatch() {
        let (service, _dir, path) = setup(50);

        assert!(service.watch_file(&path));
        assert!(!service.watch_file(&path));
        assert!(service.is_watching(&path));
        assert_eq!(service.watched_files(), vec![path.clone()]);

        assert!(service.unwatch_file(&path));
        assert!(!service.unwatch_file(&path));
        assert_eq!(service.watch_count(), 0);
    }

    #[test]
    fn test_watch_missing_file_is_noop() {
        let (service, dir, _path) = setup(50);

        assert!(!service.watch_file(dir.path().join("missing.dmp")));
        assert_eq!(service.watch_count(), 0);
    }

    #[test]
    fn test_invalidate_for_file_clears_and_notifies() {
        let (service, _dir, path) = setup(50);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        service.subscribe(move |event: &InvalidationEvent| sink.lock().push(event.clone()));
        warm_cache(&service, &path);

        service.invalidate_for_file(&path, "manual invalidation");

        let stats = service
            .caching()
            .statistics(crate::service::Category::Processes);
        assert_eq!(stats.entries_count, 0);

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_for(&path));
        assert_eq!(events[0].reason, "manual invalidation");
    }

    #[test]
    fn test_validate_unwatched_file_is_valid() {
        let (service, _dir, path) = setup(50);
        let count = counting_subscriber(&service);

        assert!(service.validate_cache_entry(&path));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validate_unchanged_file() {
        let (service, _dir, path) = setup(50);
        let count = counting_subscriber(&service);
        service.watch_file(&path);
        warm_cache(&service, &path);

        assert!(service.validate_cache_entry(&path));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validate_changed_file_invalidates_once() {
        let (service, _dir, path) = setup(10_000);
        let count = counting_subscriber(&service);
        service.watch_file(&path);
        warm_cache(&service, &path);

        append(&path, b" and more");

        assert!(!service.validate_cache_entry(&path));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(
            service
                .caching()
                .statistics(crate::service::Category::Processes)
                .entries_count,
            0
        );

        // Hash was refreshed, so the same state validates again
        assert!(service.validate_cache_entry(&path));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reported_burst_is_debounced() {
        let (service, _dir, path) = setup(100);
        service.watch_file(&path);
        let count = counting_subscriber(&service);

        service.report_change(&path);
        service.report_change(&path);
        service.report_change(&path);
        thread::sleep(Duration::from_millis(500));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reported_change_for_unwatched_file_is_ignored() {
        let (service, _dir, path) = setup(20);
        let count = counting_subscriber(&service);

        service.report_change(&path);
        thread::sleep(Duration::from_millis(200));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_os_change_triggers_invalidation() {
        let (service, _dir, path) = setup(50);
        assert!(service.watch_file(&path));
        warm_cache(&service, &path);
        let count = counting_subscriber(&service);

        append(&path, b" modified");

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }

        assert!(count.load(Ordering::SeqCst) >= 1);
        assert_eq!(
            service
                .caching()
                .statistics(crate::service::Category::Processes)
                .entries_count,
            0
        );
    }

    #[test]
    fn test_validate_after_os_change_reports_change() {
        let (service, _dir, path) = setup(50);
        assert!(service.watch_file(&path));
        let count = counting_subscriber(&service);

        append(&path, b"more");

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(count.load(Ordering::SeqCst) >= 1);

        // The watch-time hash is still recorded, so the change is reported
        assert!(!service.validate_cache_entry(&path));
        assert!(service.validate_cache_entry(&path));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (service, _dir, path) = setup(50);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = service.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(service.unsubscribe(id));
        service.invalidate_for_file(&path, "manual invalidation");
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (service, _dir, path) = setup(50);
        service.watch_file(&path);

        service.shutdown();
        assert!(service.is_shut_down());
        assert_eq!(service.watch_count(), 0);

        service.shutdown();
        assert_eq!(service.watch_count(), 0);
        assert!(!service.watch_file(&path));
    }

    #[test]
    fn test_report_change_after_shutdown_is_harmless() {
        let (service, _dir, path) = setup(50);
        service.shutdown();
        service.report_change(&path);
    }
}
