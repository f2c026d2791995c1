//! Configuration change notification system.
//!
//! Subscriber-based notifications when a store is installed or a reload
//! fails, plus file watching (with the `file-watch` feature).

pub mod subscriber;
#[cfg(feature = "file-watch")]
pub mod watcher;

pub use subscriber::{ConfigEvent, SubscriberRegistry, SubscriptionHandle};
#[cfg(feature = "file-watch")]
pub use watcher::ConfigWatcher;
