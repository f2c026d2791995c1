//! Immutable keyed configuration snapshots.

use crate::error::{ConfigError, Result, ValidationError};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Type alias for entry validator functions.
pub(crate) type Validator<C> =
    Arc<dyn Fn(&C) -> std::result::Result<(), ValidationError> + Send + Sync>;

/// One complete, immutable set of configuration entries.
///
/// A manager never mutates a store in place. Loading a source builds a new
/// store and swaps it in, so a snapshot obtained from
/// [`ConfigurationManager::snapshot`](crate::core::ConfigurationManager::snapshot)
/// stays consistent for as long as it is held.
pub struct ConfigStore<K, C> {
    entries: HashMap<K, Arc<C>>,
    source: Option<String>,
}

impl<K, C> ConfigStore<K, C>
where
    K: Eq + Hash,
{
    /// A store with no entries and no source.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            source: None,
        }
    }

    /// Build a store directly from entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (K, C)>, source: impl Into<String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, config)| (key, Arc::new(config)))
                .collect(),
            source: Some(source.into()),
        }
    }

    /// Decode a parsed document table into typed entries, validating each one.
    pub(crate) fn decode(
        document: config::Value,
        source: String,
        validator: Option<&Validator<C>>,
    ) -> Result<Self>
    where
        K: DeserializeOwned + Debug,
        C: DeserializeOwned,
    {
        let entries: HashMap<K, C> = document.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to decode entries from {}: {}", source, e))
        })?;

        if let Some(validator) = validator {
            for (key, config) in &entries {
                validator(config).map_err(|e| {
                    ConfigError::ValidationError(format!("entry {:?} from {}: {}", key, source, e))
                })?;
            }
        }

        Ok(Self::from_entries(entries, source))
    }

    /// The entry stored under `key`.
    pub fn get(&self, key: &K) -> Option<&Arc<C>> {
        self.entries.get(key)
    }

    /// Whether an entry is stored under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over the stored keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Iterate over all entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Arc<C>)> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Where the entries were loaded from, e.g. `file:/etc/app/keys.json`.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl<K: Eq + Hash, C> Default for ConfigStore<K, C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Debug, C> Debug for ConfigStore<K, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .field("source", &self.source)
            .finish()
    }
}
