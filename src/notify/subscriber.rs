//! Subscriber-based notifications for configuration changes.

use parking_lot::RwLock;
use std::sync::Arc;

/// What happened to a manager's store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEvent {
    /// A new store was installed.
    Loaded {
        /// Origin of the new store, e.g. `file:/etc/app/keys.json`.
        source: String,
        /// Number of entries in the new store.
        entries: usize,
    },
    /// A background reload failed and the previous store was kept.
    ///
    /// Only delivered under
    /// [`ReloadFailurePolicy::Notify`](crate::core::ReloadFailurePolicy::Notify).
    ReloadFailed {
        /// The source that failed to reload.
        source: String,
        /// Rendered error.
        error: String,
    },
}

type Callback = Arc<dyn Fn(&ConfigEvent) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
///
/// When the handle is dropped, the subscription is removed before `drop`
/// returns.
pub struct SubscriptionHandle {
    id: usize,
    registry: Arc<RwLock<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let id = self.id;
        self.registry
            .write()
            .subscribers
            .retain(|(sub_id, _)| *sub_id != id);
    }
}

/// Internal subscriber registry state.
struct SubscriberRegistryInner {
    subscribers: Vec<(usize, Callback)>,
    next_id: usize,
}

/// Registry for managing configuration change subscribers.
///
/// # Examples
///
/// ```rust
/// use keyswap_config::notify::{ConfigEvent, SubscriberRegistry};
///
/// let registry = SubscriberRegistry::new();
///
/// let handle = registry.subscribe(|event| {
///     println!("Config changed: {:?}", event);
/// });
///
/// registry.notify_all(&ConfigEvent::Loaded {
///     source: "string:json".to_string(),
///     entries: 2,
/// });
///
/// // Unsubscribe by dropping the handle
/// drop(handle);
/// assert_eq!(registry.subscriber_count(), 0);
/// ```
pub struct SubscriberRegistry {
    inner: Arc<RwLock<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscriberRegistryInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Subscribe to configuration changes.
    ///
    /// The callback runs on whichever thread installed the store: the caller
    /// of a `configure_*` method, or the runtime worker running a watch
    /// reload. Keep it short.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ConfigEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));

        SubscriptionHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Notify all subscribers, in subscription order.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or drop
    /// handles themselves.
    pub fn notify_all(&self, event: &ConfigEvent) {
        let callbacks: Vec<Callback> = self
            .inner
            .read()
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SubscriberRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loaded() -> ConfigEvent {
        ConfigEvent::Loaded {
            source: "test".to_string(),
            entries: 1,
        }
    }

    #[test]
    fn test_subscribe_and_notify() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let _handle = registry.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_all(&loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        registry.notify_all(&loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_receives_event() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _handle = registry.subscribe(move |event| {
            seen_clone.lock().push(event.clone());
        });

        let failed = ConfigEvent::ReloadFailed {
            source: "file:/tmp/keys.json".to_string(),
            error: "bad".to_string(),
        };
        registry.notify_all(&loaded());
        registry.notify_all(&failed);

        assert_eq!(*seen.lock(), vec![loaded(), failed]);
    }

    #[test]
    fn test_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let handle = registry.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_all(&loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        drop(handle);

        registry.notify_all(&loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscriber_count() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.subscriber_count(), 0);

        let handle1 = registry.subscribe(|_| {});
        assert_eq!(registry.subscriber_count(), 1);

        let _handle2 = registry.subscribe(|_| {});
        assert_eq!(registry.subscriber_count(), 2);

        drop(handle1);
        assert_eq!(registry.subscriber_count(), 1);
    }

    #[test]
    fn test_callback_may_subscribe() {
        let registry = SubscriberRegistry::new();
        let nested = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let registry_clone = registry.clone();
        let nested_clone = Arc::clone(&nested);
        let _handle = registry.subscribe(move |_| {
            nested_clone.lock().push(registry_clone.subscribe(|_| {}));
        });

        registry.notify_all(&loaded());
        assert_eq!(registry.subscriber_count(), 2);
    }
}
