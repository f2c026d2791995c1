//! File watching for automatic configuration reloads.

use crate::error::{ConfigError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Configuration watcher that monitors files for changes.
///
/// Uses the `notify` crate to watch the parent directory of each file and
/// filters events by path, so a file replaced through a rename (as many
/// editors save) keeps triggering reloads. Bursts of events are debounced
/// into a single reload signal sent once the burst has been quiet for the
/// debounce duration.
///
/// Must be created inside a tokio runtime.
///
/// # Examples
///
/// ```rust,no_run
/// use keyswap_config::notify::ConfigWatcher;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (watcher, mut rx) = ConfigWatcher::new(Duration::from_millis(500))?;
/// watcher.watch("/path/to/keys.json")?;
///
/// // Listen for reload signals
/// while let Some(()) = rx.recv().await {
///     println!("Config file changed, reload triggered!");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ConfigWatcher {
    watcher: Mutex<RecommendedWatcher>,
    debounce_duration: Duration,
    watched_paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl ConfigWatcher {
    /// Create a new configuration watcher.
    ///
    /// Returns the watcher and a receiver that yields one `()` per debounced
    /// burst of changes. The receiver closes once the watcher is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WatchError`] when called outside a tokio runtime
    /// or when the OS watcher cannot be created.
    pub fn new(debounce_duration: Duration) -> Result<(Self, mpsc::Receiver<()>)> {
        let runtime = Handle::try_current().map_err(|e| {
            ConfigError::WatchError(format!("File watching needs a tokio runtime: {}", e))
        })?;

        // Capacity 1: a pending signal already covers any later change.
        let (tx, rx) = mpsc::channel(1);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();
        let watched_paths: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));

        let targets = Arc::clone(&watched_paths);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
                ) {
                    return;
                }
                let targets = targets.lock();
                if event.paths.iter().any(|path| targets.contains(path)) {
                    let _ = event_tx.send(());
                }
            }
            Err(e) => tracing::warn!("File watcher error: {}", e),
        })
        .map_err(|e| ConfigError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        runtime.spawn(async move {
            while event_rx.recv().await.is_some() {
                tokio::time::sleep(debounce_duration).await;
                while event_rx.try_recv().is_ok() {}

                match tx.try_send(()) {
                    Ok(()) | Err(TrySendError::Full(())) => {}
                    Err(TrySendError::Closed(())) => break,
                }
            }
        });

        Ok((
            Self {
                watcher: Mutex::new(watcher),
                debounce_duration,
                watched_paths,
            },
            rx,
        ))
    }

    /// Add a file to watch for changes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if the file does not exist and
    /// [`ConfigError::WatchError`] if its directory cannot be watched.
    pub fn watch(&self, path: impl AsRef<Path>) -> Result<()> {
        let target = resolve(path.as_ref())?;
        let directory = parent_of(&target)?;

        // The notify callback takes the path lock, so it must not be held
        // while the OS watcher is being reconfigured.
        let directory_watched = self
            .watched_paths
            .lock()
            .iter()
            .any(|p| p.parent() == Some(directory));
        if !directory_watched {
            self.watcher
                .lock()
                .watch(directory, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    ConfigError::WatchError(format!(
                        "Failed to watch {}: {}",
                        directory.display(),
                        e
                    ))
                })?;
        }

        let mut paths = self.watched_paths.lock();
        if !paths.contains(&target) {
            tracing::debug!("Watching {}", target.display());
            paths.push(target);
        }
        Ok(())
    }

    /// Stop watching a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or its directory
    /// cannot be unwatched.
    pub fn unwatch(&self, path: impl AsRef<Path>) -> Result<()> {
        let target = resolve(path.as_ref())?;
        let directory = parent_of(&target)?;

        let directory_still_used = {
            let mut paths = self.watched_paths.lock();
            paths.retain(|p| p != &target);
            paths.iter().any(|p| p.parent() == Some(directory))
        };
        if !directory_still_used {
            self.watcher.lock().unwatch(directory).map_err(|e| {
                ConfigError::WatchError(format!(
                    "Failed to unwatch {}: {}",
                    directory.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Get the debounce duration for this watcher.
    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }

    /// Get a list of currently watched files.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.lock().clone()
    }
}

/// Absolute form of `path`, as notify reports it in events.
pub(crate) fn resolve(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            ConfigError::SourceNotFound(format!("Configuration file not found: {}", path.display()))
        }
        _ => ConfigError::IoError(e),
    })
}

fn parent_of(path: &Path) -> Result<&Path> {
    path.parent().ok_or_else(|| {
        ConfigError::WatchError(format!("{} has no parent directory", path.display()))
    })
}
