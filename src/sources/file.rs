//! File-based configuration source.

use super::ConfigSource;
use crate::error::{ConfigError, Result};
use crate::formats::FormatRegistry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-based configuration source.
///
/// Reads the whole file and parses it with the format registered for its
/// extension.
///
/// # Examples
///
/// ```rust,no_run
/// use keyswap_config::formats::FormatRegistry;
/// use keyswap_config::sources::{ConfigSource, FileSource};
///
/// # fn example() -> keyswap_config::error::Result<()> {
/// let source = FileSource::new("config/keys.yaml");
/// let document = source.load(&FormatRegistry::default())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a new file source with automatic format detection.
    ///
    /// The format is detected from the file extension, case-insensitively:
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    /// - `.xml`, `.config` -> XML (with the `xml` feature)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if the file does not exist.
    pub fn read(&self) -> Result<String> {
        read_to_string(&self.path)
    }
}

/// Read a file, reporting a missing file as [`ConfigError::SourceNotFound`].
pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::SourceNotFound(format!(
            "Configuration file not found: {}",
            path.display()
        )),
        _ => ConfigError::IoError(e),
    })
}

impl ConfigSource for FileSource {
    fn load(&self, formats: &FormatRegistry) -> Result<config::Value> {
        // Resolve the parser first so an unknown extension is reported even
        // when the file is also missing.
        let parser = formats.for_path(&self.path)?;
        let text = self.read()?;
        parser.parse(&text)
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("keys.yaml");

        fs::write(
            &config_path,
            r#"
primary:
  secret: abc
backup:
  secret: def
"#,
        )
        .unwrap();

        let source = FileSource::new(&config_path);
        let document = source.load(&FormatRegistry::default()).unwrap();
        assert_eq!(document.into_table().unwrap().len(), 2);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let source = FileSource::new("/nonexistent/keys.yaml");
        let result = source.load(&FormatRegistry::default());
        assert!(matches!(result, Err(ConfigError::SourceNotFound(_))));
    }

    #[test]
    fn test_load_unknown_extension() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("keys.txt");
        fs::write(&config_path, "primary = abc").unwrap();

        let result = FileSource::new(&config_path).load(&FormatRegistry::default());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("keys.json");
        fs::write(&config_path, r#"{"primary": "#).unwrap();

        let result = FileSource::new(&config_path).load(&FormatRegistry::default());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_name() {
        let source = FileSource::new("keys.yaml");
        assert!(source.name().starts_with("file:"));
        assert!(source.name().contains("keys.yaml"));
    }
}
