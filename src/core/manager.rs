//! The keyed configuration manager.

use crate::core::ConfigStore;
use crate::core::store::Validator;
use crate::error::{ConfigError, Result};
use crate::formats::FormatRegistry;
use crate::notify::{ConfigEvent, SubscriberRegistry, SubscriptionHandle};
use crate::sources::{ConfigSource, FileSource, TextSource};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "xml")]
use crate::sources::AppConfigSource;

#[cfg(feature = "file-watch")]
use crate::notify::{ConfigWatcher, watcher::resolve};
#[cfg(feature = "file-watch")]
use std::time::Duration;
#[cfg(feature = "file-watch")]
use tokio::sync::mpsc;
#[cfg(feature = "file-watch")]
use tokio::task::JoinHandle;

/// What a background reload does when the changed file cannot be loaded.
///
/// The previous store is kept under every policy; a failed reload never
/// leaves a partially replaced or empty store behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadFailurePolicy {
    /// Keep the previous store, log a warning and record the error for
    /// [`ConfigurationManager::last_reload_error`].
    #[default]
    KeepPrevious,
    /// Like `KeepPrevious`, and also deliver [`ConfigEvent::ReloadFailed`]
    /// to subscribers.
    Notify,
}

/// State shared between the manager and its reload task.
pub(crate) struct Shared<K, C> {
    store: ArcSwap<ConfigStore<K, C>>,
    formats: FormatRegistry,
    validator: Option<Validator<C>>,
    #[cfg(feature = "xml")]
    app_config: AppConfigSource,
    /// Bumped by every explicit load and by stopping a watch. Reloads carry
    /// the generation their watch was started with and are dropped once it
    /// is stale.
    generation: Mutex<u64>,
    subscribers: SubscriberRegistry,
    reload_policy: ReloadFailurePolicy,
    last_reload_error: Mutex<Option<String>>,
    last_file: Mutex<Option<PathBuf>>,
}

impl<K, C> Shared<K, C>
where
    K: Eq + Hash + Debug + DeserializeOwned,
    C: DeserializeOwned,
{
    fn load(&self, source: &dyn ConfigSource) -> Result<ConfigStore<K, C>> {
        let document = source.load(&self.formats)?;
        ConfigStore::decode(document, source.name(), self.validator.as_ref())
    }

    /// Install `store` as a new explicit load and return its generation.
    fn install(&self, store: ConfigStore<K, C>) -> (u64, ConfigEvent) {
        let mut generation = self.generation.lock();
        *generation += 1;
        (*generation, self.swap(store))
    }

    /// Install `store` only if no explicit load or watch change happened since
    /// `expected` was current.
    fn install_if_current(&self, store: ConfigStore<K, C>, expected: u64) -> Option<ConfigEvent> {
        let generation = self.generation.lock();
        if *generation != expected {
            return None;
        }
        Some(self.swap(store))
    }

    fn swap(&self, store: ConfigStore<K, C>) -> ConfigEvent {
        let event = ConfigEvent::Loaded {
            source: store.source().unwrap_or_default().to_string(),
            entries: store.len(),
        };
        tracing::info!(
            "Loaded {} configuration entries from {}",
            store.len(),
            store.source().unwrap_or("<unknown>")
        );
        self.store.store(Arc::new(store));
        event
    }

    fn current_generation(&self) -> u64 {
        *self.generation.lock()
    }

    #[cfg(feature = "file-watch")]
    fn invalidate(&self) {
        *self.generation.lock() += 1;
    }

    /// Reload `path` on behalf of a watch started at `generation`.
    #[cfg(feature = "file-watch")]
    fn reload_watched(&self, path: &Path, generation: u64) {
        let source = FileSource::new(path);
        match self.load(&source) {
            Ok(store) => match self.install_if_current(store, generation) {
                Some(event) => {
                    *self.last_reload_error.lock() = None;
                    self.subscribers.notify_all(&event);
                }
                None => tracing::debug!("Discarded reload of {}: watch superseded", path.display()),
            },
            Err(e) => self.reload_failed(source.name(), e),
        }
    }

    #[cfg(feature = "file-watch")]
    fn reload_failed(&self, source: String, error: ConfigError) {
        tracing::warn!("Reload of {} failed, keeping previous configuration: {}", source, error);
        let error = error.to_string();
        *self.last_reload_error.lock() = Some(error.clone());
        if self.reload_policy == ReloadFailurePolicy::Notify {
            self.subscribers
                .notify_all(&ConfigEvent::ReloadFailed { source, error });
        }
    }
}

/// An active file watch and the task applying its reloads.
#[cfg(feature = "file-watch")]
struct WatchBinding {
    path: PathBuf,
    _watcher: ConfigWatcher,
    task: Option<JoinHandle<()>>,
}

#[cfg(feature = "file-watch")]
impl Drop for WatchBinding {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(feature = "file-watch")]
async fn run_reloads<K, C>(
    shared: Arc<Shared<K, C>>,
    path: PathBuf,
    generation: u64,
    mut signals: mpsc::Receiver<()>,
) where
    K: Eq + Hash + Debug + DeserializeOwned,
    C: DeserializeOwned,
{
    while signals.recv().await.is_some() {
        tracing::debug!("Change detected in {}", path.display());
        shared.reload_watched(&path, generation);
    }
}

/// Loads, holds and serves configuration entries of type `C` keyed by `K`.
///
/// Reads are lock-free: every lookup goes through an `arc-swap` pointer to an
/// immutable [`ConfigStore`], so a reader sees either the complete old store
/// or the complete new one. Every `configure_*` call replaces the whole store
/// and is all-or-nothing: if loading fails, the previous store stays in place.
///
/// # Examples
///
/// ```rust
/// use keyswap_config::prelude::*;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, Default)]
/// struct Signing {
///     secret: String,
///     max_age: u32,
/// }
///
/// # fn example() -> Result<()> {
/// let manager: ConfigurationManager<String, Signing> = ConfigurationManager::new();
/// manager.configure_from_str(
///     r#"{"primary": {"secret": "abc", "max_age": 300}}"#,
///     "JSON",
/// )?;
///
/// let primary = manager.get(&"primary".to_string())?;
/// assert_eq!(primary.max_age, 300);
/// assert!(!manager.contains(&"backup".to_string()));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ConfigurationManager<K, C> {
    shared: Arc<Shared<K, C>>,
    /// Serializes store replacement with watch changes.
    #[cfg(feature = "file-watch")]
    watch: Mutex<Option<WatchBinding>>,
    #[cfg(not(feature = "file-watch"))]
    watch: Mutex<()>,
    #[cfg(feature = "file-watch")]
    watch_debounce: Duration,
}

impl<K, C> ConfigurationManager<K, C>
where
    K: Eq + Hash + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    C: DeserializeOwned + Send + Sync + 'static,
{
    /// Create a manager with the built-in formats and default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub(crate) fn from_parts(
        formats: FormatRegistry,
        validator: Option<Validator<C>>,
        reload_policy: ReloadFailurePolicy,
        #[cfg(feature = "xml")] app_config: AppConfigSource,
        #[cfg(feature = "file-watch")] watch_debounce: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: ArcSwap::from_pointee(ConfigStore::empty()),
                formats,
                validator,
                #[cfg(feature = "xml")]
                app_config,
                generation: Mutex::new(0),
                subscribers: SubscriberRegistry::new(),
                reload_policy,
                last_reload_error: Mutex::new(None),
                last_file: Mutex::new(None),
            }),
            watch: Mutex::new(Default::default()),
            #[cfg(feature = "file-watch")]
            watch_debounce,
        }
    }

    /// A newly constructed default configuration, independent of the store.
    pub fn get_default(&self) -> C
    where
        C: Default,
    {
        C::default()
    }

    /// Keys currently present in the store, in no particular order.
    pub fn all_keys(&self) -> Vec<K> {
        self.shared.store.load().keys().cloned().collect()
    }

    /// The entry for `key`, or `None` if there is none.
    pub fn try_get(&self, key: &K) -> Option<Arc<C>> {
        self.shared.store.load().get(key).cloned()
    }

    /// The entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KeyNotFound`] if no entry is stored under `key`.
    pub fn get(&self, key: &K) -> Result<Arc<C>> {
        self.try_get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(format!("{:?}", key)))
    }

    /// A copy of the entry for `key`, or the default configuration.
    pub fn get_or_default(&self, key: &K) -> C
    where
        C: Clone + Default,
    {
        self.try_get(key)
            .map(|config| config.as_ref().clone())
            .unwrap_or_default()
    }

    /// Whether an entry is stored under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.shared.store.load().contains(key)
    }

    /// The whole current store, for several lookups against one consistent
    /// version.
    pub fn snapshot(&self) -> Arc<ConfigStore<K, C>> {
        self.shared.store.load_full()
    }

    /// Number of entries in the store.
    pub fn len(&self) -> usize {
        self.shared.store.load().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.store.load().is_empty()
    }

    /// Origin of the current store, or `None` before the first load.
    pub fn source(&self) -> Option<String> {
        self.shared.store.load().source().map(str::to_string)
    }

    /// The format registry used by this manager.
    pub fn formats(&self) -> &FormatRegistry {
        &self.shared.formats
    }

    /// Load all entries from `text`, written in `format` (e.g. `"JSON"`,
    /// `"xml"`; case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for an unknown format and
    /// [`ConfigError::ParseError`] for malformed text. The store is left
    /// unchanged on error.
    pub fn configure_from_str(&self, text: &str, format: &str) -> Result<()> {
        self.configure_from_source(&TextSource::new(text, format))
    }

    /// Read `reader` to its end and load it like
    /// [`configure_from_str`](Self::configure_from_str).
    ///
    /// # Errors
    ///
    /// As `configure_from_str`, plus [`ConfigError::IoError`] if reading
    /// fails.
    pub fn configure_from_reader<R: Read>(&self, mut reader: R, format: &str) -> Result<()> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.configure_from_str(&text, format)
    }

    /// Load all entries from the application's XML config file.
    ///
    /// See [`AppConfigSource`] for how the file and section are located.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if the file or section does not
    /// exist and [`ConfigError::ParseError`] for malformed content.
    #[cfg(feature = "xml")]
    pub fn configure_from_app_config(&self) -> Result<()> {
        let source = self.shared.app_config.clone();
        self.configure_from_source(&source)
    }

    /// Load all entries from a file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if the file does not exist,
    /// [`ConfigError::UnsupportedFormat`] for an unknown extension and
    /// [`ConfigError::ParseError`] for malformed content.
    pub fn configure_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let store = self.shared.load(&FileSource::new(path))?;
        self.replace(store, Some(path.to_path_buf()));
        Ok(())
    }

    /// Load all entries from any [`ConfigSource`].
    ///
    /// # Errors
    ///
    /// Returns whatever the source reports, or [`ConfigError::ParseError`] if
    /// the document does not decode into `K` and `C`.
    pub fn configure_from_source(&self, source: &dyn ConfigSource) -> Result<()> {
        let store = self.shared.load(source)?;
        self.replace(store, None);
        Ok(())
    }

    /// Install an explicitly loaded store, ending any active watch.
    fn replace(&self, store: ConfigStore<K, C>, file: Option<PathBuf>) {
        #[cfg_attr(not(feature = "file-watch"), allow(unused_mut))]
        let mut watch = self.watch.lock();
        #[cfg(feature = "file-watch")]
        let previous = watch.take();
        let (_, event) = self.shared.install(store);
        *self.shared.last_file.lock() = file;
        drop(watch);

        #[cfg(feature = "file-watch")]
        if let Some(previous) = previous {
            tracing::info!("Stopped watching {}", previous.path.display());
        }
        self.shared.subscribers.notify_all(&event);
    }

    /// Load all entries from a file and keep reloading them whenever the file
    /// changes.
    ///
    /// Changes are picked up by a background task on the current tokio
    /// runtime; this call does not wait for any file event. A reload that
    /// fails keeps the previous store and is handled according to the
    /// configured [`ReloadFailurePolicy`].
    ///
    /// Any previous watch is replaced. Watching stops on
    /// [`stop_watching`](Self::stop_watching), on any other `configure_*`
    /// call, and when the manager is dropped.
    ///
    /// # Errors
    ///
    /// The same errors as [`configure_from_file`](Self::configure_from_file),
    /// plus [`ConfigError::WatchError`] if the watch cannot be set up (for
    /// example outside a tokio runtime). On any error neither the store nor
    /// the previous watch changes.
    #[cfg(feature = "file-watch")]
    pub fn configure_from_file_and_watch(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = resolve(path.as_ref())?;

        // Register before reading so an edit racing the initial load still
        // produces a reload signal.
        let (watcher, signals) = ConfigWatcher::new(self.watch_debounce)?;
        watcher.watch(&path)?;
        let store = self.shared.load(&FileSource::new(&path))?;

        let mut watch = self.watch.lock();
        let previous = watch.take();
        let (generation, event) = self.shared.install(store);
        *self.shared.last_file.lock() = Some(path.clone());

        let task = tokio::spawn(run_reloads(
            Arc::clone(&self.shared),
            path.clone(),
            generation,
            signals,
        ));
        tracing::info!("Watching {} for changes", path.display());
        *watch = Some(WatchBinding {
            path,
            _watcher: watcher,
            task: Some(task),
        });
        drop(watch);

        drop(previous);
        self.shared.subscribers.notify_all(&event);
        Ok(())
    }

    /// Stop the active watch and wait for its reload task to finish.
    ///
    /// Returns `false` if nothing was being watched. Once this returns, no
    /// reload from the stopped watch can replace the store.
    #[cfg(feature = "file-watch")]
    pub async fn stop_watching(&self) -> bool {
        let binding = {
            let mut watch = self.watch.lock();
            let binding = watch.take();
            if binding.is_some() {
                self.shared.invalidate();
            }
            binding
        };

        let Some(mut binding) = binding else {
            return false;
        };
        if let Some(task) = binding.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::warn!(
                        "Reload task for {} panicked: {}",
                        binding.path.display(),
                        e
                    );
                }
            }
        }
        tracing::info!("Stopped watching {}", binding.path.display());
        true
    }

    /// Whether a file watch is active.
    #[cfg(feature = "file-watch")]
    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    /// The file being watched, if any.
    #[cfg(feature = "file-watch")]
    pub fn watched_path(&self) -> Option<PathBuf> {
        self.watch.lock().as_ref().map(|binding| binding.path.clone())
    }

    /// Reload the store from the file it was last loaded from.
    ///
    /// An active watch stays active. If another load replaces the store while
    /// this reload is reading the file, the reload is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Other`] if the store was not loaded from a file,
    /// or any error of [`configure_from_file`](Self::configure_from_file).
    /// Errors are returned to the caller, not routed through the
    /// [`ReloadFailurePolicy`].
    pub fn reload(&self) -> Result<()> {
        let generation = self.shared.current_generation();
        let path = self.shared.last_file.lock().clone().ok_or_else(|| {
            ConfigError::Other("No file to reload: the store was not loaded from a file".to_string())
        })?;

        let store = self.shared.load(&FileSource::new(&path))?;
        match self.shared.install_if_current(store, generation) {
            Some(event) => self.shared.subscribers.notify_all(&event),
            None => tracing::debug!("Discarded reload of {}: store replaced", path.display()),
        }
        Ok(())
    }

    /// Subscribe to store changes. Drop the handle to unsubscribe.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use keyswap_config::prelude::*;
    /// # use serde::Deserialize;
    /// # #[derive(Debug, Deserialize)]
    /// # struct Signing { secret: String }
    /// # fn example() -> Result<()> {
    /// let manager: ConfigurationManager<String, Signing> = ConfigurationManager::new();
    /// let handle = manager.subscribe(|event| {
    ///     if let ConfigEvent::Loaded { source, entries } = event {
    ///         println!("{} entries from {}", entries, source);
    ///     }
    /// });
    /// manager.configure_from_str("primary:\n  secret: abc\n", "yaml")?;
    /// drop(handle);
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ConfigEvent) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    /// Error of the most recent background reload, cleared by the next
    /// successful one.
    pub fn last_reload_error(&self) -> Option<String> {
        self.shared.last_reload_error.lock().clone()
    }

    /// The policy applied to failed background reloads.
    pub fn reload_policy(&self) -> ReloadFailurePolicy {
        self.shared.reload_policy
    }
}

impl<K, C> Default for ConfigurationManager<K, C>
where
    K: Eq + Hash + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    C: DeserializeOwned + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
