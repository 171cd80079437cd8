//! Global Cache Interface
//!
//! The narrow capability external callers rely on: look a key up, or write a
//! value that wins over whatever is currently stored.

use std::hash::Hash;
use std::time::Duration;

use tracing::trace;

use crate::cache::listener::RemovalCause;
use crate::cache::store::Cache;
use crate::cache::weigher::ConstantWeigher;
use crate::cache::{REFERENCE_ENTRY_WEIGHT, REFERENCE_MAX_WEIGHT, REFERENCE_TTL_SECS};
use crate::error::Result;

// == Global Cache ==
/// Read/write surface shared by every cache implementation.
pub trait GlobalCache<K, V>: Send + Sync {
    /// Returns the live value for `key`, if any.
    fn get_if_present(&self, key: &K) -> Option<V>;

    /// Stores `value`, replacing any current value for `key` atomically.
    fn put_or_merge(&self, key: K, value: V);
}

impl<K, V> GlobalCache<K, V> for Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get_if_present(&self, key: &K) -> Option<V> {
        self.get(key)
    }

    fn put_or_merge(&self, key: K, value: V) {
        self.merge(key, value, |_existing, new| Some(new));
    }
}

// == Reference Cache ==
/// Builds the cache used by the reader/writer driver.
///
/// 200 MiB maximum weight, every entry weighing 80, statistics enabled and a
/// listener that only traces removals. With `with_expiration`, entries also
/// expire two hours after their last write or last access.
pub fn reference_cache(with_expiration: bool) -> Result<Cache<u64, String>> {
    let mut builder = Cache::builder(REFERENCE_MAX_WEIGHT)
        .weigher(ConstantWeigher(REFERENCE_ENTRY_WEIGHT))
        .record_stats()
        .removal_listener(|key: u64, _value: String, cause: RemovalCause| {
            trace!(key, %cause, "Entry removed");
        });

    if with_expiration {
        let ttl = Duration::from_secs(REFERENCE_TTL_SECS);
        builder = builder.expire_after_write(ttl).expire_after_access(ttl);
    }

    builder.build()
}
