//! Format parsers and the registry that dispatches to them.
//!
//! Every parser turns raw text into a `config::Value` tree whose top-level
//! table maps entry keys to entry bodies. Decoding that tree into typed
//! entries happens later, in [`ConfigStore`](crate::core::ConfigStore).
//!
//! XML has no list syntax: a child element becomes a list only when it
//! repeats. Fields that may hold a single item should use [`one_or_many`]:
//!
//! ```rust
//! use keyswap_config::formats::one_or_many;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Signing {
//!     secret: String,
//!     #[serde(default, deserialize_with = "one_or_many")]
//!     header: Vec<String>,
//! }
//! ```

mod structured;
#[cfg(feature = "xml")]
mod xml;

pub use structured::StructuredFormat;
#[cfg(feature = "xml")]
pub(crate) use xml::XmlElement;
#[cfg(feature = "xml")]
pub use xml::XmlFormat;

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Trait for configuration document parsers.
///
/// Implement this trait to teach a manager a new document format, then
/// register it with
/// [`ConfigurationManagerBuilder::with_format`](crate::core::ConfigurationManagerBuilder::with_format).
///
/// # Examples
///
/// ```rust
/// use keyswap_config::error::{ConfigError, Result};
/// use keyswap_config::formats::FormatParser;
///
/// /// `key=value` lines, one entry per line, each entry a single `value` field.
/// struct LineFormat;
///
/// impl FormatParser for LineFormat {
///     fn name(&self) -> &str {
///         "lines"
///     }
///
///     fn extensions(&self) -> &[&str] {
///         &["lines"]
///     }
///
///     fn parse(&self, text: &str) -> Result<config::Value> {
///         let mut entries = config::Map::new();
///         for line in text.lines().filter(|l| !l.trim().is_empty()) {
///             let (key, value) = line
///                 .split_once('=')
///                 .ok_or_else(|| ConfigError::ParseError(format!("missing '=' in {line:?}")))?;
///             let mut body = config::Map::new();
///             body.insert("value".to_string(), config::Value::from(value.trim()));
///             entries.insert(key.trim().to_string(), config::Value::from(body));
///         }
///         Ok(config::Value::from(entries))
///     }
/// }
/// ```
pub trait FormatParser: Send + Sync {
    /// Identifier used by `configure_from_str` (matched case-insensitively).
    fn name(&self) -> &str;

    /// File extensions, without the leading dot, that select this parser.
    fn extensions(&self) -> &[&str];

    /// Parse a whole document into a table of entries.
    ///
    /// # Errors
    ///
    /// Should return [`ConfigError::ParseError`] for malformed input.
    fn parse(&self, text: &str) -> Result<config::Value>;
}

/// Deserialize a list that may also be written as a single item.
///
/// Use with `#[serde(deserialize_with = "one_or_many")]`, plus
/// `#[serde(default)]` when the list may be absent. Items are decoded without
/// string coercion, so XML lists should hold `String`s or types that
/// deserialize from strings.
pub fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

/// Registry mapping format identifiers and file extensions to parsers.
///
/// Adding a format is a registration, not a new branch in the loader. Names
/// and extensions are stored lowercase.
#[derive(Clone)]
pub struct FormatRegistry {
    parsers: HashMap<String, Arc<dyn FormatParser>>,
    extensions: HashMap<String, String>,
}

impl FormatRegistry {
    /// Create a registry without any parsers.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Create a registry with the built-in JSON, YAML and TOML parsers, plus
    /// XML when the `xml` feature is enabled.
    pub fn with_builtin_formats() -> Self {
        let mut registry = Self::empty();
        registry.register(StructuredFormat::json());
        registry.register(StructuredFormat::yaml());
        registry.register(StructuredFormat::toml());
        #[cfg(feature = "xml")]
        registry.register(XmlFormat::new());
        registry
    }

    /// Register a parser, replacing any parser previously registered under
    /// the same name or claiming the same extensions.
    pub fn register<P: FormatParser + 'static>(&mut self, parser: P) {
        self.register_arc(Arc::new(parser));
    }

    pub(crate) fn register_arc(&mut self, parser: Arc<dyn FormatParser>) {
        let name = parser.name().to_ascii_lowercase();
        for ext in parser.extensions() {
            self.extensions
                .insert(ext.trim_start_matches('.').to_ascii_lowercase(), name.clone());
        }
        self.parsers.insert(name, parser);
    }

    /// Look up a parser by format identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] if nothing is registered
    /// under `format`.
    pub fn get(&self, format: &str) -> Result<Arc<dyn FormatParser>> {
        self.parsers
            .get(&format.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                ConfigError::UnsupportedFormat(format!(
                    "{} (registered: {})",
                    format,
                    self.names().join(", ")
                ))
            })
    }

    /// Pick a parser from a file's extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] if the path has no extension
    /// or the extension is not registered.
    pub fn for_path(&self, path: &Path) -> Result<Arc<dyn FormatParser>> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ConfigError::UnsupportedFormat(format!(
                    "Unable to determine file format for: {}",
                    path.display()
                ))
            })?
            .to_ascii_lowercase();

        let name = self.extensions.get(&extension).ok_or_else(|| {
            ConfigError::UnsupportedFormat(format!(
                "Unsupported file extension: .{} ({})",
                extension,
                path.display()
            ))
        })?;
        self.get(name)
    }

    /// Whether a parser is registered under `format`.
    pub fn supports(&self, format: &str) -> bool {
        self.parsers.contains_key(&format.trim().to_ascii_lowercase())
    }

    /// Registered format identifiers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parsers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_builtin_formats()
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullFormat;

    impl FormatParser for NullFormat {
        fn name(&self) -> &str {
            "Null"
        }

        fn extensions(&self) -> &[&str] {
            &[".null", "nil"]
        }

        fn parse(&self, _text: &str) -> Result<config::Value> {
            Ok(config::Value::from(config::Map::<String, config::Value>::new()))
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FormatRegistry::with_builtin_formats();
        assert!(registry.get("JSON").is_ok());
        assert!(registry.get("json").is_ok());
        assert!(registry.get(" Yaml ").is_ok());
        assert!(registry.supports("TOML"));
    }

    #[test]
    fn test_unknown_format() {
        let registry = FormatRegistry::with_builtin_formats();
        let err = registry.get("ini").err().unwrap();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_detect_from_extension() {
        let registry = FormatRegistry::with_builtin_formats();
        assert_eq!(registry.for_path(Path::new("a.json")).unwrap().name(), "json");
        assert_eq!(registry.for_path(Path::new("a.YML")).unwrap().name(), "yaml");
        assert_eq!(registry.for_path(Path::new("dir/a.yaml")).unwrap().name(), "yaml");
        assert_eq!(registry.for_path(Path::new("a.toml")).unwrap().name(), "toml");
    }

    #[test]
    fn test_detect_unknown_extension() {
        let registry = FormatRegistry::with_builtin_formats();
        assert!(matches!(
            registry.for_path(Path::new("config.txt")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            registry.for_path(Path::new("Makefile")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_register_custom_format() {
        let mut registry = FormatRegistry::empty();
        assert!(registry.names().is_empty());

        registry.register(NullFormat);
        assert_eq!(registry.names(), vec!["null"]);
        assert!(registry.get("NULL").is_ok());
        assert!(registry.for_path(Path::new("x.null")).is_ok());
        assert!(registry.for_path(Path::new("x.nil")).is_ok());
    }
}
