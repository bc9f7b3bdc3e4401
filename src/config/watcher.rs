//! File watcher for the sideload source root.
//!
//! Watches the source directory recursively and emits change events through a
//! tokio watch channel. Uses debouncing to coalesce rapid file changes, e.g.
//! an editor writing a temp file then renaming it.

use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Event types emitted when documents under the source root change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChangeEvent {
    /// A single document changed
    Document(PathBuf),
    /// Multiple files changed in quick succession
    BatchChange(Vec<PathBuf>),
    /// Watcher encountered an error
    Error(String),
}

impl SourceChangeEvent {
    /// Returns true if this event requires a cache reload.
    pub fn requires_reload(&self) -> bool {
        !matches!(self, SourceChangeEvent::Error(_))
    }

    pub fn affected_paths(&self) -> Vec<&Path> {
        match self {
            SourceChangeEvent::Document(p) => vec![p.as_path()],
            SourceChangeEvent::BatchChange(paths) => paths.iter().map(|p| p.as_path()).collect(),
            SourceChangeEvent::Error(_) => vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Handle to control the source watcher. Dropping it stops the watcher.
pub struct SourceWatcherHandle {
    pub events: watch::Receiver<Option<SourceChangeEvent>>,
    _task_handle: tokio::task::JoinHandle<()>,
}

impl SourceWatcherHandle {
    /// Wait for the next change event. Returns `None` once the watcher stops.
    pub async fn wait_for_change(&mut self) -> Option<SourceChangeEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None;
            }
            let event = self.events.borrow().clone();
            if event.is_some() {
                return event;
            }
        }
    }
}

/// Start watching `root` recursively.
///
/// ```ignore
/// let mut handle = start_source_watcher(root, WatcherConfig::default())?;
/// while let Some(event) = handle.wait_for_change().await {
///     if event.requires_reload() {
///         node.reload();
///     }
/// }
/// ```
pub fn start_source_watcher(
    root: PathBuf,
    config: WatcherConfig,
) -> Result<SourceWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    info!("Watching source directory: {}", root.display());
    debouncer
        .watcher()
        .watch(&root, notify::RecursiveMode::Recursive)?;

    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx);
    });

    Ok(SourceWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<SourceChangeEvent>>,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if let Some(event) = classify_events(events) {
                    debug!("Source change detected: {:?}", event);
                    if tx.send(Some(event)).is_err() {
                        info!("Source watcher receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                let _ = tx.send(Some(SourceChangeEvent::Error(e.to_string())));
            }
            Err(_) => {
                info!("Source watcher channel closed, stopping");
                return;
            }
        }
    }
}

fn classify_events(events: Vec<notify_debouncer_mini::DebouncedEvent>) -> Option<SourceChangeEvent> {
    let mut changed: Vec<PathBuf> = events
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
            )
        })
        .map(|e| e.path)
        .filter(|p| is_relevant(p))
        .collect();

    match changed.len() {
        0 => None,
        1 => changed.pop().map(SourceChangeEvent::Document),
        _ => Some(SourceChangeEvent::BatchChange(changed)),
    }
}

/// Editor swap files, backups and hidden files never hold documents.
fn is_relevant(path: &Path) -> bool {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if file_name.is_empty() {
        return false;
    }
    !(file_name.starts_with('.')
        || file_name.ends_with('~')
        || file_name.ends_with(".swp")
        || file_name.ends_with(".tmp"))
}
