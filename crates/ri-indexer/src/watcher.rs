use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::Receiver;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use ri_parser::ParserRegistry;

use crate::error::IndexerError;
use crate::scanner::{absolute, VENDOR_DIRS};

/// A change of a C/C++ file under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Created or modified. Normalized absolute path.
    Changed(PathBuf),
    /// Deleted. Normalized absolute path.
    Removed(PathBuf),
}

impl ChangeEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}

/// Handle to a running watcher. Dropping it stops the watcher.
pub struct WatcherHandle {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    pub events: Receiver<ChangeEvent>,
    root: PathBuf,
}

impl WatcherHandle {
    /// Stop watching and return the events still buffered.
    pub fn stop(self) -> Vec<ChangeEvent> {
        drop(self._debouncer);
        std::thread::sleep(Duration::from_millis(50));
        self.events.try_iter().collect()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Watch `root` recursively for changes of C/C++ files, coalescing bursts
/// within `debounce`.
pub fn start_watching(root: &Path, debounce: Duration) -> Result<WatcherHandle, IndexerError> {
    let root = root
        .canonicalize()
        .map_err(|e| IndexerError::Watcher(format!("cannot canonicalize path: {e}")))?;

    let (tx, rx) = crossbeam_channel::bounded::<ChangeEvent>(4096);
    let watched_root = root.clone();

    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "watcher error");
                return;
            }
        };

        for event in events {
            let path = &event.path;
            if path
                .symlink_metadata()
                .is_ok_and(|m| m.file_type().is_symlink())
            {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&watched_root) else {
                continue;
            };
            if !is_watchable_path(relative) {
                continue;
            }

            let absolute = absolute(&watched_root, relative);
            let change = if path.exists() {
                ChangeEvent::Changed(absolute)
            } else {
                ChangeEvent::Removed(absolute)
            };
            let _ = tx.send(change);
        }
    })
    .map_err(|e| IndexerError::Watcher(format!("failed to create debouncer: {e}")))?;

    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| IndexerError::Watcher(format!("failed to start watching: {e}")))?;

    tracing::info!(root = %root.display(), debounce_ms = debounce.as_millis() as u64, "watching");
    Ok(WatcherHandle {
        _debouncer: debouncer,
        events: rx,
        root,
    })
}

/// Same rules as the scanner, minus `.gitignore`.
fn is_watchable_path(relative: &Path) -> bool {
    for component in relative.components() {
        if let Component::Normal(name) = component {
            let name = name.to_string_lossy();
            if name.starts_with('.') || VENDOR_DIRS.contains(&name.as_ref()) {
                return false;
            }
        }
    }
    ParserRegistry::is_indexable_path(&relative.to_string_lossy())
}
