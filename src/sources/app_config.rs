//! XML application config file source.

use super::ConfigSource;
use super::file::read_to_string;
use crate::error::{ConfigError, Result};
use crate::formats::FormatRegistry;
use crate::formats::XmlElement;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the application config location.
pub const APP_CONFIG_ENV: &str = "KEYSWAP_APP_CONFIG";

/// Section element read when no other section name is configured.
pub const DEFAULT_SECTION: &str = "keyedConfigurations";

/// The application's XML config file.
///
/// The file is located, in order of preference, at:
/// 1. the path given with [`with_path`](Self::with_path)
/// 2. the path in the `KEYSWAP_APP_CONFIG` environment variable
/// 3. the running executable's path with `.config` appended
///
/// Entries are the children of one section element directly below the root:
///
/// ```xml
/// <configuration>
///   <keyedConfigurations>
///     <add key="primary" secret="abc" />
///   </keyedConfigurations>
/// </configuration>
/// ```
#[derive(Debug, Clone)]
pub struct AppConfigSource {
    path: Option<PathBuf>,
    section: String,
}

impl AppConfigSource {
    /// Source at the conventional location, reading the default section.
    pub fn new() -> Self {
        Self {
            path: None,
            section: DEFAULT_SECTION.to_string(),
        }
    }

    /// Read this file instead of the conventional location.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Read entries from this section element.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Name of the section element entries are read from.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// The file this source will read.
    ///
    /// # Errors
    ///
    /// Returns an error if no path was configured and the executable path
    /// cannot be determined.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Some(path) = std::env::var_os(APP_CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let exe = std::env::current_exe()?;
        Ok(exe_config_path(&exe))
    }
}

impl Default for AppConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

/// `/usr/bin/app` -> `/usr/bin/app.config`
fn exe_config_path(exe: &Path) -> PathBuf {
    let mut name = exe
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(".config");
    exe.with_file_name(name)
}

impl ConfigSource for AppConfigSource {
    fn load(&self, _formats: &FormatRegistry) -> Result<config::Value> {
        let path = self.resolve_path()?;
        let text = read_to_string(&path)?;
        let root = XmlElement::parse_document(&text)?;
        let section = root.child(&self.section).ok_or_else(|| {
            ConfigError::SourceNotFound(format!(
                "section <{}> not found under <{}> in {}",
                self.section,
                root.name,
                path.display()
            ))
        })?;
        Ok(section.entries())
    }

    fn name(&self) -> String {
        match self.resolve_path() {
            Ok(path) => format!("app-config:{}#{}", path.display(), self.section),
            Err(_) => format!("app-config:<unresolved>#{}", self.section),
        }
    }
}
