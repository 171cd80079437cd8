//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with write/access bookkeeping.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Entries never leave the cache; callers only receive clones of `value`.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Cost units computed by the weigher when the value was written
    pub weight: u64,
    /// Last time the value was written
    pub last_write: Instant,
    /// Last time the value was read or written
    pub last_access: Instant,
    /// Global recency tick of the last access, used for cross-shard LRU ordering
    pub access_tick: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a freshly written entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `weight` - Weight assigned by the weigher
    /// * `now` - Write instant
    /// * `tick` - Recency tick taken under the shard lock
    pub fn new(value: V, weight: u64, now: Instant, tick: u64) -> Self {
        Self {
            value,
            weight,
            last_write: now,
            last_access: now,
            access_tick: tick,
        }
    }

    // == Touch ==
    /// Records a read access.
    pub fn touch(&mut self, now: Instant, tick: u64) {
        self.last_access = now;
        self.access_tick = tick;
    }

    // == Age ==
    /// Time elapsed since the last write.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_write)
    }

    // == Idle ==
    /// Time elapsed since the last access.
    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access)
    }
}
