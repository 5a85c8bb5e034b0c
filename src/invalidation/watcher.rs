//! OS file notifications and the debounce loop
//!
//! Each watched file gets its own `notify` watcher on its parent directory
//! (so replace-by-rename is still seen) filtered down to the file name. The
//! notify callback only forwards a [`WatchSignal`] over a channel; the
//! debounce loop on the receiving side decides when to act.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{trace, warn};

/// Default quiet period before a burst of notifications is acted upon.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

// == Watch Signal ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WatchSignal {
    /// A watched file was modified, renamed or deleted
    Changed(PathBuf),
    /// Stop the debounce loop
    Shutdown,
}

// == Subscribe ==
/// Starts an OS subscription that reports changes of `path` as
/// [`WatchSignal::Changed`] carrying `path` exactly as given.
pub(crate) fn subscribe_file(
    path: &Path,
    signals: Sender<WatchSignal>,
) -> notify::Result<RecommendedWatcher> {
    let file_name: OsString = path
        .file_name()
        .ok_or_else(|| notify::Error::generic("path has no file name"))?
        .to_os_string();
    let key = path.to_path_buf();
    let dir = parent_dir(path);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let ours = event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if ours && is_change(&event.kind) {
                trace!(path = %key.display(), kind = ?event.kind, "file notification");
                // The receiver is gone only during shutdown
                let _ = signals.send(WatchSignal::Changed(key.clone()));
            }
        }
        Err(err) => warn!(path = %key.display(), error = %err, "file watcher error"),
    })?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Modify, remove and rename events count; create covers a rename into place.
fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Create(_)
    )
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// == Debounce Loop ==
/// Consumes signals until [`WatchSignal::Shutdown`] or disconnection.
///
/// Every notification for a path pushes its deadline `debounce` into the
/// future; `on_change` runs once per path when its deadline passes without a
/// new notification.
pub(crate) fn run_debounce_loop(
    signals: Receiver<WatchSignal>,
    debounce: Duration,
    mut on_change: impl FnMut(&Path),
) {
    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();

    loop {
        let received = match pending.values().min().copied() {
            Some(deadline) => {
                signals.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => signals.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(WatchSignal::Changed(path)) => {
                pending.insert(path, Instant::now() + debounce);
            }
            Ok(WatchSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        let due: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        for path in due {
            pending.remove(&path);
            on_change(&path);
        }
    }
}
