//! Cache Builder
//!
//! Collects the construction options and validates them before producing a
//! cache. Misconfiguration fails here; no cache instance is created.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::expiry::Expiration;
use crate::cache::listener::RemovalListener;
use crate::cache::store::Cache;
use crate::cache::weigher::{UnitWeigher, Weigher};
use crate::cache::DEFAULT_SHARD_COUNT;
use crate::error::{CacheError, Result};

/// Builder for [`Cache`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bounded_cache::cache::{Cache, ConstantWeigher};
///
/// let cache: Cache<u64, String> = Cache::builder(800)
///     .weigher(ConstantWeigher(80))
///     .record_stats()
///     .expire_after_access(Duration::from_secs(2))
///     .build()
///     .unwrap();
///
/// cache.put(1, "hello".to_string());
/// assert_eq!(cache.get(&1).as_deref(), Some("hello"));
/// ```
pub struct CacheBuilder<K, V> {
    max_weight: u64,
    shards: usize,
    weigher: Box<dyn Weigher<K, V>>,
    record_stats: bool,
    listener: Option<Arc<dyn RemovalListener<K, V>>>,
    expire_after_write: Option<Duration>,
    expire_after_access: Option<Duration>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder for a cache bounded by `max_weight`.
    ///
    /// Defaults: every entry weighs 1, statistics off, no listener, no TTLs.
    pub fn new(max_weight: u64) -> Self {
        Self {
            max_weight,
            shards: DEFAULT_SHARD_COUNT,
            weigher: Box::new(UnitWeigher),
            record_stats: false,
            listener: None,
            expire_after_write: None,
            expire_after_access: None,
        }
    }

    /// Sets the function computing each entry's weight.
    pub fn weigher(mut self, weigher: impl Weigher<K, V>) -> Self {
        self.weigher = Box::new(weigher);
        self
    }

    /// Enables hit, miss, load, eviction and expiration counters.
    pub fn record_stats(mut self) -> Self {
        self.record_stats = true;
        self
    }

    /// Sets the callback invoked on every removal.
    pub fn removal_listener(mut self, listener: impl RemovalListener<K, V>) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Expires entries once `ttl` has elapsed since their last write.
    pub fn expire_after_write(mut self, ttl: Duration) -> Self {
        self.expire_after_write = Some(ttl);
        self
    }

    /// Expires entries once `ttl` has elapsed since their last read or write.
    pub fn expire_after_access(mut self, ttl: Duration) -> Self {
        self.expire_after_access = Some(ttl);
        self
    }

    /// Sets the number of shards, rounded up to a power of two.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Validates the configuration and creates the cache.
    pub fn build(self) -> Result<Cache<K, V>> {
        if self.max_weight == 0 {
            return Err(CacheError::invalid_config("max_weight must be positive"));
        }
        if self.shards == 0 {
            return Err(CacheError::invalid_config("shard count must be positive"));
        }
        let shard_count = self.shards.checked_next_power_of_two().ok_or_else(|| {
            CacheError::invalid_config(format!("shard count {} is too large", self.shards))
        })?;

        Ok(Cache::with_settings(
            self.max_weight,
            shard_count,
            self.weigher,
            Expiration::new(self.expire_after_write, self.expire_after_access),
            self.record_stats,
            self.listener,
        ))
    }
}
