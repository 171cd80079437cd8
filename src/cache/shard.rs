//! Shard Module
//!
//! One partition of the store. Each shard keeps its entries in recency order
//! (most recently used first) and tracks the weight it holds. Shards are not
//! thread-safe on their own; the cache wraps each one in a mutex.

use std::hash::Hash;
use std::time::Instant;

use lru::LruCache;

use crate::cache::entry::CacheEntry;
use crate::cache::expiry::Expiration;

// == Shard ==
pub(crate) struct Shard<K, V> {
    /// Entries ordered by access recency
    entries: LruCache<K, CacheEntry<V>>,
    /// Sum of the weights of the entries held by this shard
    weight: u64,
}

impl<K: Hash + Eq, V> Shard<K, V> {
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            weight: 0,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Looks an entry up without changing its recency.
    pub fn peek(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.peek(key)
    }

    /// Looks an entry up and moves it to the most recently used position.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut CacheEntry<V>> {
        self.entries.get_mut(key)
    }

    // == Insert ==
    /// Inserts or replaces an entry as most recently used.
    ///
    /// Returns the replaced mapping, if any.
    pub fn insert(&mut self, key: K, entry: CacheEntry<V>) -> Option<(K, CacheEntry<V>)> {
        self.weight += entry.weight;
        // Unbounded, so push only ever hands back a replaced mapping
        let old = self.entries.push(key, entry);
        if let Some((_, ref old)) = old {
            self.weight -= old.weight;
        }
        old
    }

    // == Remove ==
    pub fn remove(&mut self, key: &K) -> Option<(K, CacheEntry<V>)> {
        let removed = self.entries.pop_entry(key);
        if let Some((_, ref entry)) = removed {
            self.weight -= entry.weight;
        }
        removed
    }

    // == LRU Head ==
    /// Access tick of the least recently used entry.
    pub fn lru_tick(&self) -> Option<u64> {
        self.entries.peek_lru().map(|(_, entry)| entry.access_tick)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, CacheEntry<V>)> {
        let popped = self.entries.pop_lru();
        if let Some((_, ref entry)) = popped {
            self.weight -= entry.weight;
        }
        popped
    }

    // == Expired Keys ==
    /// Collects the keys of every entry expired at `now`.
    pub fn expired_keys(&self, expiration: &Expiration, now: Instant) -> Vec<K>
    where
        K: Clone,
    {
        self.entries
            .iter()
            .filter(|(_, entry)| expiration.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Removes every entry, least recently used first.
    pub fn drain(&mut self) -> Vec<(K, CacheEntry<V>)> {
        let mut drained = Vec::with_capacity(self.entries.len());
        while let Some(item) = self.entries.pop_lru() {
            drained.push(item);
        }
        self.weight = 0;
        drained
    }
}
