//! # keyswap-config
//!
//! Keyed configuration store with format-dispatched loading and lock-free
//! hot-reloads.
//!
//! ## Overview
//!
//! A [`ConfigurationManager<K, C>`](core::ConfigurationManager) holds many
//! configuration entries of one type `C`, each under its own key `K`, and
//! loads them all at once from:
//! - a string tagged with a format name (`"JSON"`, `"yaml"`, `"toml"`, `"xml"`)
//! - a file, with the format chosen by extension
//! - the application's XML config file
//! - a watched file, reloaded automatically when it changes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyswap_config::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, Clone, Default)]
//! struct Signing {
//!     secret: String,
//!     max_age: u32,
//! }
//!
//! # async fn example() -> keyswap_config::error::Result<()> {
//! let manager: ConfigurationManager<String, Signing> = ConfigurationManager::new();
//!
//! // Load every entry in the file and reload whenever it changes
//! manager.configure_from_file_and_watch("config/signing.yaml")?;
//!
//! // Lock-free reads
//! let primary = manager.get(&"primary".to_string())?;
//! println!("max age: {}", primary.max_age);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Lock-free reads**: lookups go through `arc-swap`
//! - **Atomic replacement**: readers never see a partially loaded store
//! - **All-or-nothing loads**: a failed load keeps the previous store
//! - **Format registry**: add document formats by registration
//! - **File watching**: automatic reload on file changes
//! - **Validation**: reject invalid entries before they are installed
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): `configure_from_file_and_watch`, needs tokio
//! - `validation` (default): the [`Validate`](core::Validate) trait
//! - `xml` (default): XML documents and `configure_from_app_config`

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod formats;
pub mod notify;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ConfigStore, ConfigurationManager, ConfigurationManagerBuilder, ReloadFailurePolicy,
    };
    pub use crate::error::{ConfigError, Result, ValidationError};
    pub use crate::notify::ConfigEvent;

    #[cfg(feature = "validation")]
    pub use crate::core::Validate;
}
