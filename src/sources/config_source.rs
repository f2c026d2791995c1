//! Configuration source trait.

use crate::error::Result;
use crate::formats::FormatRegistry;

/// Trait for configuration sources.
///
/// A source produces one complete document of entries. Implement this trait
/// to load entries from somewhere the built-in sources do not cover, then
/// hand it to
/// [`ConfigurationManager::configure_from_source`](crate::core::ConfigurationManager::configure_from_source).
pub trait ConfigSource: Send + Sync {
    /// Load the document as a table of entry key to entry body.
    ///
    /// The registry is the one the manager was built with, so sources can
    /// dispatch to the same parsers as `configure_from_str`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self, formats: &FormatRegistry) -> Result<config::Value>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}
