//! Cache Store Module
//!
//! Main cache engine: sharded storage, weight accounting, lazy expiration,
//! LRU eviction, statistics and removal notification.
//!
//! # Locking
//!
//! Every key lives in exactly one shard and every per-key operation locks only
//! that shard, so operations on keys in different shards never contend. No code
//! path holds two shard locks at once. Removal listeners are invoked after the
//! shard lock has been released.

use std::collections::hash_map::RandomState;
use std::convert::Infallible;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::builder::CacheBuilder;
use crate::cache::entry::CacheEntry;
use crate::cache::expiry::Expiration;
use crate::cache::listener::{Notifier, Removal, RemovalCause, RemovalListener};
use crate::cache::lru::select_victim;
use crate::cache::shard::Shard;
use crate::cache::stats::{CacheStats, StatsCounter};
use crate::cache::weigher::Weigher;

// == Maintenance Summary ==
/// What one maintenance pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Maintenance {
    /// Entries removed because a TTL elapsed
    pub expired: usize,
    /// Entries evicted to satisfy the weight bound
    pub evicted: usize,
}

// == Cache ==
/// Bounded, weight-limited concurrent cache.
///
/// Share it between threads with `Arc<Cache<K, V>>`. All methods take `&self`.
pub struct Cache<K, V> {
    /// Power-of-two number of independently locked partitions
    shards: Box<[Mutex<Shard<K, V>>]>,
    /// Picks the shard of a key
    hasher: RandomState,
    /// Upper bound on the sum of entry weights
    max_weight: u64,
    /// Running sum of entry weights
    weighted_size: AtomicU64,
    /// Number of entries across all shards
    entry_count: AtomicUsize,
    /// Global access sequence for cross-shard recency
    ticker: AtomicU64,
    weigher: Box<dyn Weigher<K, V>>,
    expiration: Expiration,
    stats: StatsCounter,
    notifier: Notifier<K, V>,
    /// Serializes eviction passes
    eviction_lock: Mutex<()>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts configuring a cache bounded by `max_weight`.
    pub fn builder(max_weight: u64) -> CacheBuilder<K, V> {
        CacheBuilder::new(max_weight)
    }

    // == Constructor ==
    /// Creates the engine from already validated settings.
    pub(crate) fn with_settings(
        max_weight: u64,
        shard_count: usize,
        weigher: Box<dyn Weigher<K, V>>,
        expiration: Expiration,
        record_stats: bool,
        listener: Option<Arc<dyn RemovalListener<K, V>>>,
    ) -> Self {
        debug_assert!(shard_count.is_power_of_two());
        let shards = (0..shard_count).map(|_| Mutex::new(Shard::new())).collect();

        debug!(
            max_weight,
            shard_count,
            record_stats,
            expire_after_write = ?expiration.after_write(),
            expire_after_access = ?expiration.after_access(),
            "Cache created"
        );

        Self {
            shards,
            hasher: RandomState::new(),
            max_weight,
            weighted_size: AtomicU64::new(0),
            entry_count: AtomicUsize::new(0),
            ticker: AtomicU64::new(0),
            weigher,
            expiration,
            stats: StatsCounter::new(record_stats),
            notifier: Notifier::new(listener),
            eviction_lock: Mutex::new(()),
        }
    }

    // == Get ==
    /// Returns the value for `key` if it is present and not expired.
    ///
    /// A hit refreshes the entry's access time and recency. Records exactly one
    /// hit or miss. An expired entry found here is removed on the spot.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut expired = None;

        let found = {
            let mut shard = self.shard_for(key).lock();
            match self.liveness(&shard, key, now) {
                None => None,
                Some(false) => {
                    expired = self.remove_locked(&mut shard, key, now, RemovalCause::Expired);
                    None
                }
                Some(true) => {
                    let tick = self.next_tick();
                    shard.get_mut(key).map(|entry| {
                        entry.touch(now, tick);
                        entry.value.clone()
                    })
                }
            }
        };

        if found.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        if let Some(removal) = expired {
            self.notifier.notify(vec![removal]);
        }
        found
    }

    // == Put ==
    /// Inserts or replaces the value for `key`.
    ///
    /// A replaced entry is reported with [`RemovalCause::Replaced`]. If the
    /// cache ends up over its maximum weight, least recently used entries are
    /// evicted before this returns.
    pub fn put(&self, key: K, value: V) {
        let now = Instant::now();
        let mut removals = Vec::new();
        {
            let mut shard = self.shard_for(&key).lock();
            self.store_locked(&mut shard, key, value, now, &mut removals);
        }
        self.finish_write(removals);
    }

    // == Merge ==
    /// Atomically combines `value` with the current value for `key`.
    ///
    /// Without a live entry `value` is stored as is. Otherwise
    /// `remapping(&current, value)` decides: `Some(v)` replaces the entry,
    /// `None` removes it. Returns the value now mapped to `key`.
    ///
    /// The read-compute-write sequence runs under the key's shard lock, so
    /// concurrent merges on one key are applied one after another. `remapping`
    /// must not call back into this cache.
    pub fn merge<F>(&self, key: K, value: V, remapping: F) -> Option<V>
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        let now = Instant::now();
        let mut removals = Vec::new();

        let result = {
            let mut shard = self.shard_for(&key).lock();
            if self.liveness(&shard, &key, now) == Some(false) {
                removals.extend(self.remove_locked(&mut shard, &key, now, RemovalCause::Expired));
            }

            let merged = match shard.peek(&key) {
                Some(current) => remapping(&current.value, value),
                None => Some(value),
            };

            match merged {
                Some(new_value) => {
                    let stored = new_value.clone();
                    self.store_locked(&mut shard, key, new_value, now, &mut removals)
                        .then_some(stored)
                }
                None => {
                    removals.extend(self.remove_locked(
                        &mut shard,
                        &key,
                        now,
                        RemovalCause::Explicit,
                    ));
                    None
                }
            }
        };

        self.finish_write(removals);
        result
    }

    // == Get Or Insert ==
    /// Returns the live value for `key`, computing and storing it if absent.
    ///
    /// Counts a hit when present, otherwise a miss plus one load. `init` runs
    /// under the key's shard lock and must not call back into this cache.
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.try_get_or_insert_with(key, || Ok::<V, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`Cache::get_or_insert_with`].
    ///
    /// A loader error is recorded as a load failure, nothing is stored and the
    /// error is returned.
    pub fn try_get_or_insert_with<E, F>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let now = Instant::now();
        let mut removals = Vec::new();

        let outcome = {
            let mut shard = self.shard_for(&key).lock();
            match self.liveness(&shard, &key, now) {
                Some(true) => {
                    let tick = self.next_tick();
                    if let Some(entry) = shard.get_mut(&key) {
                        entry.touch(now, tick);
                        self.stats.record_hit();
                        return Ok(entry.value.clone());
                    }
                }
                Some(false) => {
                    removals.extend(self.remove_locked(
                        &mut shard,
                        &key,
                        now,
                        RemovalCause::Expired,
                    ));
                }
                None => {}
            }

            self.stats.record_miss();
            let started = Instant::now();
            match init() {
                Ok(value) => {
                    self.stats.record_load_success(started.elapsed());
                    let loaded = value.clone();
                    self.store_locked(&mut shard, key, value, Instant::now(), &mut removals);
                    Ok(loaded)
                }
                Err(err) => {
                    self.stats.record_load_failure(started.elapsed());
                    Err(err)
                }
            }
        };

        self.finish_write(removals);
        outcome
    }

    // == Contains Key ==
    /// Returns true if a live entry exists. Touches neither recency nor stats.
    pub fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        let shard = self.shard_for(key).lock();
        self.liveness(&shard, key, now) == Some(true)
    }

    /// Remaining lifetime of the entry for `key`.
    ///
    /// `None` if the key is absent, expired, or no clock is configured.
    pub fn time_to_live(&self, key: &K) -> Option<Duration> {
        let now = Instant::now();
        let shard = self.shard_for(key).lock();
        shard
            .peek(key)
            .filter(|entry| !self.expiration.is_expired(entry, now))
            .and_then(|entry| self.expiration.time_to_live(entry, now))
    }

    // == Invalidate ==
    /// Removes the entry for `key`, returning its value if it was live.
    pub fn invalidate(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let removal = {
            let mut shard = self.shard_for(key).lock();
            self.remove_locked(&mut shard, key, now, RemovalCause::Explicit)
        };

        let removal = removal?;
        let value = (removal.cause == RemovalCause::Explicit).then(|| removal.value.clone());
        self.notifier.notify(vec![removal]);
        value
    }

    /// Removes every entry.
    pub fn invalidate_all(&self) {
        for lock in self.shards.iter() {
            let drained = {
                let mut shard = lock.lock();
                let drained = shard.drain();
                for (_, entry) in &drained {
                    self.unlink(entry);
                }
                drained
            };

            let now = Instant::now();
            let removals = drained
                .into_iter()
                .map(|(key, entry)| self.removal(key, entry, now, RemovalCause::Explicit))
                .collect();
            self.notifier.notify(removals);
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        if !self.expiration.is_enabled() {
            return 0;
        }

        let mut removed = 0;
        for lock in self.shards.iter() {
            let now = Instant::now();
            let mut removals = Vec::new();
            {
                let mut shard = lock.lock();
                for key in shard.expired_keys(&self.expiration, now) {
                    removals.extend(self.remove_locked(
                        &mut shard,
                        &key,
                        now,
                        RemovalCause::Expired,
                    ));
                }
            }
            removed += removals.len();
            self.notifier.notify(removals);
        }

        if removed > 0 {
            debug!(removed, "Expired entries swept");
        }
        removed
    }

    /// Runs one full maintenance pass: expiration sweep, then eviction.
    pub fn run_pending_tasks(&self) -> Maintenance {
        Maintenance {
            expired: self.cleanup_expired(),
            evicted: self.evict_to_budget(),
        }
    }

    // == Accessors ==
    /// Current number of entries, expired but unswept ones included.
    pub fn entry_count(&self) -> usize {
        self.entry_count.load(Ordering::Relaxed)
    }

    /// Current sum of entry weights.
    pub fn weighted_size(&self) -> u64 {
        self.weighted_size.load(Ordering::Acquire)
    }

    pub fn max_weight(&self) -> u64 {
        self.max_weight
    }

    pub fn expiration(&self) -> Expiration {
        self.expiration
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns true if statistics are being recorded.
    pub fn records_stats(&self) -> bool {
        self.stats.is_enabled()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entry_count(), self.weighted_size())
    }

    /// Recomputes the total weight by walking every shard.
    ///
    /// Matches [`Cache::weighted_size`] whenever no write is in flight.
    pub fn audit_weighted_size(&self) -> u64 {
        self.shards.iter().map(|lock| lock.lock().weight()).sum()
    }

    // == Internals ==
    fn shard_for(&self, key: &K) -> &Mutex<Shard<K, V>> {
        let index = (self.hasher.hash_one(key) as usize) & (self.shards.len() - 1);
        &self.shards[index]
    }

    fn next_tick(&self) -> u64 {
        self.ticker.fetch_add(1, Ordering::Relaxed)
    }

    /// `None` if absent, `Some(true)` if live, `Some(false)` if expired.
    fn liveness(&self, shard: &Shard<K, V>, key: &K, now: Instant) -> Option<bool> {
        shard
            .peek(key)
            .map(|entry| !self.expiration.is_expired(entry, now))
    }

    fn is_over_budget(&self) -> bool {
        self.weighted_size.load(Ordering::Acquire) > self.max_weight
    }

    /// Writes `value` under `key`, or rejects it if it can never fit.
    ///
    /// Returns true if the value was stored.
    fn store_locked(
        &self,
        shard: &mut Shard<K, V>,
        key: K,
        value: V,
        now: Instant,
        removals: &mut Vec<Removal<K, V>>,
    ) -> bool {
        let weight = self.weigher.weigh(&key, &value);
        if weight > self.max_weight {
            debug!(
                weight,
                max_weight = self.max_weight,
                "Entry heavier than the cache maximum rejected"
            );
            removals.extend(self.remove_locked(shard, &key, now, RemovalCause::Replaced));
            self.stats.record_eviction(weight);
            removals.push(Removal::new(key, value, RemovalCause::Size));
            return false;
        }

        let entry = CacheEntry::new(value, weight, now, self.next_tick());
        match shard.insert(key, entry) {
            Some((old_key, old)) => {
                // Apply the net delta; the key is never counted twice
                if weight >= old.weight {
                    self.weighted_size
                        .fetch_add(weight - old.weight, Ordering::AcqRel);
                } else {
                    self.weighted_size
                        .fetch_sub(old.weight - weight, Ordering::AcqRel);
                }
                removals.push(self.removal(old_key, old, now, RemovalCause::Replaced));
            }
            None => {
                self.weighted_size.fetch_add(weight, Ordering::AcqRel);
                self.entry_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        true
    }

    fn remove_locked(
        &self,
        shard: &mut Shard<K, V>,
        key: &K,
        now: Instant,
        cause: RemovalCause,
    ) -> Option<Removal<K, V>> {
        let (key, entry) = shard.remove(key)?;
        self.unlink(&entry);
        Some(self.removal(key, entry, now, cause))
    }

    fn unlink(&self, entry: &CacheEntry<V>) {
        self.weighted_size.fetch_sub(entry.weight, Ordering::AcqRel);
        self.entry_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Builds the removal record and applies the counter policy.
    ///
    /// An entry that had already expired is always reported as expired.
    fn removal(
        &self,
        key: K,
        entry: CacheEntry<V>,
        now: Instant,
        cause: RemovalCause,
    ) -> Removal<K, V> {
        let cause = if self.expiration.is_expired(&entry, now) {
            RemovalCause::Expired
        } else {
            cause
        };
        match cause {
            RemovalCause::Expired => self.stats.record_expiration(),
            RemovalCause::Size => self.stats.record_eviction(entry.weight),
            RemovalCause::Explicit | RemovalCause::Replaced => {}
        }
        Removal::new(key, entry.value, cause)
    }

    fn finish_write(&self, removals: Vec<Removal<K, V>>) {
        self.notifier.notify(removals);
        self.evict_to_budget();
    }

    // == Evict ==
    /// Evicts least recently used entries until the weight bound holds.
    ///
    /// Returns the number of entries evicted for size.
    fn evict_to_budget(&self) -> usize {
        if !self.is_over_budget() {
            return 0;
        }

        let mut removals = Vec::new();
        let mut evicted = 0;
        {
            let _guard = self.eviction_lock.lock();
            while self.is_over_budget() {
                let Some(victim) = select_victim(&self.shards) else {
                    break;
                };

                let now = Instant::now();
                let mut shard = self.shards[victim.shard].lock();
                // The head moved since it was observed; pick again
                if shard.lru_tick() != Some(victim.tick) {
                    continue;
                }
                // A concurrent removal may have restored the bound while we waited
                if !self.is_over_budget() {
                    break;
                }
                let Some((key, entry)) = shard.pop_lru() else {
                    continue;
                };
                self.unlink(&entry);
                drop(shard);

                trace!(weight = entry.weight, tick = victim.tick, "Evicting entry");
                let removal = self.removal(key, entry, now, RemovalCause::Size);
                if removal.cause == RemovalCause::Size {
                    evicted += 1;
                }
                removals.push(removal);
            }
        }

        self.notifier.notify(removals);
        evicted
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("max_weight", &self.max_weight)
            .field("weighted_size", &self.weighted_size.load(Ordering::Relaxed))
            .field("entry_count", &self.entry_count.load(Ordering::Relaxed))
            .field("shards", &self.shards.len())
            .field("expiration", &self.expiration)
            .finish()
    }
}
