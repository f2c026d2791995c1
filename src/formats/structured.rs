//! JSON, YAML and TOML documents, parsed by the config crate.

use super::FormatParser;
use crate::error::{ConfigError, Result};
use config::{FileFormat, Format, Value, ValueKind};

/// A format backed by one of the config crate's file formats.
pub struct StructuredFormat {
    name: &'static str,
    extensions: &'static [&'static str],
    format: FileFormat,
}

impl StructuredFormat {
    /// JSON documents (`.json`).
    pub fn json() -> Self {
        Self {
            name: "json",
            extensions: &["json"],
            format: FileFormat::Json,
        }
    }

    /// YAML documents (`.yaml`, `.yml`).
    pub fn yaml() -> Self {
        Self {
            name: "yaml",
            extensions: &["yaml", "yml"],
            format: FileFormat::Yaml,
        }
    }

    /// TOML documents (`.toml`).
    pub fn toml() -> Self {
        Self {
            name: "toml",
            extensions: &["toml"],
            format: FileFormat::Toml,
        }
    }
}

impl FormatParser for StructuredFormat {
    fn name(&self) -> &str {
        self.name
    }

    fn extensions(&self) -> &[&str] {
        self.extensions
    }

    fn parse(&self, text: &str) -> Result<Value> {
        let table = Format::parse(&self.format, None, text)
            .map_err(|e| ConfigError::ParseError(format!("invalid {}: {}", self.name, e)))?;
        Ok(Value::new(None, ValueKind::Table(table)))
    }
}
