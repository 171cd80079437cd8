//! Removal Notification
//!
//! Delivers every physical removal to the configured listener, outside of any
//! shard lock. Listener panics are contained and logged.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

// == Removal Cause ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// A write or access TTL elapsed
    Expired,
    /// Evicted to bring the total weight back under the maximum
    Size,
    /// Removed by the caller (invalidate, or a merge that yielded no value)
    Explicit,
    /// Overwritten by a newer value for the same key
    Replaced,
}

impl RemovalCause {
    /// Returns true if the removal was decided by the cache rather than the caller.
    pub fn was_evicted(&self) -> bool {
        matches!(self, RemovalCause::Expired | RemovalCause::Size)
    }
}

impl fmt::Display for RemovalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemovalCause::Expired => "expired",
            RemovalCause::Size => "size",
            RemovalCause::Explicit => "explicit",
            RemovalCause::Replaced => "replaced",
        };
        f.write_str(name)
    }
}

// == Removal Listener ==
/// Callback notified once for every entry removal, whatever the cause.
pub trait RemovalListener<K, V>: Send + Sync + 'static {
    fn on_removal(&self, key: K, value: V, cause: RemovalCause);
}

impl<K, V, F> RemovalListener<K, V> for F
where
    F: Fn(K, V, RemovalCause) + Send + Sync + 'static,
{
    fn on_removal(&self, key: K, value: V, cause: RemovalCause) {
        self(key, value, cause)
    }
}

/// A removed mapping waiting to be delivered.
#[derive(Debug)]
pub(crate) struct Removal<K, V> {
    pub key: K,
    pub value: V,
    pub cause: RemovalCause,
}

impl<K, V> Removal<K, V> {
    pub fn new(key: K, value: V, cause: RemovalCause) -> Self {
        Self { key, value, cause }
    }
}

// == Notifier ==
pub(crate) struct Notifier<K, V> {
    listener: Option<Arc<dyn RemovalListener<K, V>>>,
}

impl<K: 'static, V: 'static> Notifier<K, V> {
    pub fn new(listener: Option<Arc<dyn RemovalListener<K, V>>>) -> Self {
        Self { listener }
    }

    /// Delivers removals in order. Must be called with no shard lock held.
    pub fn notify(&self, removals: Vec<Removal<K, V>>) {
        let Some(listener) = &self.listener else {
            return;
        };

        for Removal { key, value, cause } in removals {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                listener.on_removal(key, value, cause);
            }));
            if let Err(payload) = delivered {
                error!(
                    cause = %cause,
                    "Removal listener panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_was_evicted() {
        assert!(RemovalCause::Expired.was_evicted());
        assert!(RemovalCause::Size.was_evicted());
        assert!(!RemovalCause::Explicit.was_evicted());
        assert!(!RemovalCause::Replaced.was_evicted());
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(RemovalCause::Size.to_string(), "size");
        assert_eq!(RemovalCause::Replaced.to_string(), "replaced");
    }

    #[test]
    fn test_notify_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Arc<dyn RemovalListener<u64, &'static str>> =
            Arc::new(move |k: u64, v: &'static str, c: RemovalCause| sink.lock().push((k, v, c)));
        let notifier = Notifier::new(Some(listener));

        notifier.notify(vec![
            Removal::new(1, "a", RemovalCause::Size),
            Removal::new(2, "b", RemovalCause::Expired),
        ]);

        assert_eq!(
            *seen.lock(),
            vec![(1, "a", RemovalCause::Size), (2, "b", RemovalCause::Expired)]
        );
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Arc<dyn RemovalListener<u64, u64>> =
            Arc::new(move |k: u64, _v: u64, _c: RemovalCause| {
                if k == 1 {
                    panic!("listener failure");
                }
                sink.lock().push(k);
            });
        let notifier = Notifier::new(Some(listener));

        notifier.notify(vec![
            Removal::new(1, 10, RemovalCause::Explicit),
            Removal::new(2, 20, RemovalCause::Explicit),
        ]);

        // The second removal is still delivered after the first one panicked
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_notify_without_listener() {
        let notifier: Notifier<u64, u64> = Notifier::new(None);
        notifier.notify(vec![Removal::new(1, 1, RemovalCause::Size)]);
    }
}
