//! Core configuration management types.

mod builder;
mod manager;
mod store;

#[cfg(feature = "validation")]
mod validation;

#[cfg(feature = "file-watch")]
pub use builder::DEFAULT_WATCH_DEBOUNCE;
pub use builder::ConfigurationManagerBuilder;
pub use manager::{ConfigurationManager, ReloadFailurePolicy};
pub use store::ConfigStore;

#[cfg(feature = "validation")]
pub use validation::Validate;
