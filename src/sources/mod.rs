//! Configuration source implementations.

#[cfg(feature = "xml")]
mod app_config;
mod config_source;
mod file;
mod text;

#[cfg(feature = "xml")]
pub use app_config::{APP_CONFIG_ENV, AppConfigSource, DEFAULT_SECTION};
pub use config_source::ConfigSource;
pub use file::FileSource;
pub use text::TextSource;
