//! In-memory text configuration source.

use super::ConfigSource;
use crate::error::Result;
use crate::formats::FormatRegistry;

/// A document held in memory, tagged with its format identifier.
#[derive(Debug, Clone)]
pub struct TextSource {
    text: String,
    format: String,
}

impl TextSource {
    /// Create a source for `text` written in `format` (e.g. `"JSON"`).
    pub fn new(text: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: format.into(),
        }
    }
}

impl ConfigSource for TextSource {
    fn load(&self, formats: &FormatRegistry) -> Result<config::Value> {
        formats.get(&self.format)?.parse(&self.text)
    }

    fn name(&self) -> String {
        format!("string:{}", self.format.to_ascii_lowercase())
    }
}
