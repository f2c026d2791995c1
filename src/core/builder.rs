//! Builder for constructing ConfigurationManager instances.

use crate::core::store::Validator;
use crate::core::{ConfigurationManager, ReloadFailurePolicy};
use crate::error::ValidationError;
use crate::formats::{FormatParser, FormatRegistry};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "xml")]
use crate::sources::AppConfigSource;
#[cfg(feature = "xml")]
use std::path::PathBuf;
#[cfg(feature = "file-watch")]
use std::time::Duration;

#[cfg(feature = "validation")]
use crate::core::Validate;

/// Default quiet period before a watched file change triggers a reload.
#[cfg(feature = "file-watch")]
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Builder for constructing a `ConfigurationManager` instance.
///
/// # Examples
///
/// ```rust
/// use keyswap_config::prelude::*;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, Clone)]
/// struct Signing {
///     secret: String,
///     max_age: u32,
/// }
///
/// let manager: ConfigurationManager<String, Signing> = ConfigurationManager::builder()
///     .with_reload_policy(ReloadFailurePolicy::Notify)
///     .with_validation(|config: &Signing| {
///         if config.secret.is_empty() {
///             return Err(ValidationError::invalid_field("secret", "must not be empty"));
///         }
///         Ok(())
///     })
///     .build();
/// ```
pub struct ConfigurationManagerBuilder<K, C> {
    formats: FormatRegistry,
    validator: Option<Validator<C>>,
    reload_policy: ReloadFailurePolicy,
    #[cfg(feature = "xml")]
    app_config: AppConfigSource,
    #[cfg(feature = "file-watch")]
    watch_debounce: Duration,
    _keys: PhantomData<fn() -> K>,
}

impl<K, C> ConfigurationManagerBuilder<K, C>
where
    K: Eq + Hash + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    C: DeserializeOwned + Send + Sync + 'static,
{
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            formats: FormatRegistry::with_builtin_formats(),
            validator: None,
            reload_policy: ReloadFailurePolicy::default(),
            #[cfg(feature = "xml")]
            app_config: AppConfigSource::new(),
            #[cfg(feature = "file-watch")]
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
            _keys: PhantomData,
        }
    }

    /// Register an additional document format.
    ///
    /// A parser with the same name as a built-in one replaces it.
    pub fn with_format<P: FormatParser + 'static>(mut self, parser: P) -> Self {
        self.formats.register(parser);
        self
    }

    /// Replace the whole format registry.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Read the application config from this file instead of the
    /// conventional location.
    #[cfg(feature = "xml")]
    pub fn with_app_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.app_config = self.app_config.with_path(path);
        self
    }

    /// Read application config entries from this section element.
    #[cfg(feature = "xml")]
    pub fn with_app_config_section(mut self, section: impl Into<String>) -> Self {
        self.app_config = self.app_config.with_section(section);
        self
    }

    /// Choose what a failed background reload does.
    pub fn with_reload_policy(mut self, policy: ReloadFailurePolicy) -> Self {
        self.reload_policy = policy;
        self
    }

    /// Quiet period a watched file must observe before it is reloaded.
    #[cfg(feature = "file-watch")]
    pub fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce = debounce;
        self
    }

    /// Add a validation function every entry must pass before a store is
    /// installed.
    ///
    /// Validators accumulate: each one added runs after the previous ones.
    /// A rejected entry fails the whole load, so the previous store stays.
    pub fn with_validation<F>(mut self, validator: F) -> Self
    where
        F: Fn(&C) -> std::result::Result<(), ValidationError> + Send + Sync + 'static,
    {
        let combined: Validator<C> = match self.validator.take() {
            None => Arc::new(validator),
            Some(previous) => Arc::new(move |config: &C| {
                previous(config)?;
                validator(config)
            }),
        };
        self.validator = Some(combined);
        self
    }

    /// Validate every entry with its [`Validate`] implementation.
    #[cfg(feature = "validation")]
    pub fn validate_entries(self) -> Self
    where
        C: Validate,
    {
        self.with_validation(|config: &C| config.validate())
    }

    /// Build the manager. It starts unconfigured, with an empty store.
    pub fn build(self) -> ConfigurationManager<K, C> {
        ConfigurationManager::from_parts(
            self.formats,
            self.validator,
            self.reload_policy,
            #[cfg(feature = "xml")]
            self.app_config,
            #[cfg(feature = "file-watch")]
            self.watch_debounce,
        )
    }
}

impl<K, C> Default for ConfigurationManagerBuilder<K, C>
where
    K: Eq + Hash + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    C: DeserializeOwned + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, C> ConfigurationManager<K, C>
where
    K: Eq + Hash + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    C: DeserializeOwned + Send + Sync + 'static,
{
    /// Create a new builder for constructing a manager.
    pub fn builder() -> ConfigurationManagerBuilder<K, C> {
        ConfigurationManagerBuilder::new()
    }
}
