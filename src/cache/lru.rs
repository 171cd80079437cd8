//! LRU Eviction Policy
//!
//! Picks the globally least recently used entry across all shards.
//!
//! Every access stamps its entry with a tick from one shared counter while the
//! shard lock is held, so within a shard recency order and tick order agree.
//! The global victim is therefore the shard head with the smallest tick.

use std::hash::Hash;

use parking_lot::Mutex;

use crate::cache::shard::Shard;

// == Victim ==
/// Eviction candidate: the shard holding it and the tick it was observed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Victim {
    pub shard: usize,
    pub tick: u64,
}

// == Select Victim ==
/// Returns the least recently used entry over all shards.
///
/// Locks one shard at a time; the result may be stale by the time the caller
/// re-locks the shard, so callers must check the tick again before evicting.
pub(crate) fn select_victim<K: Hash + Eq, V>(shards: &[Mutex<Shard<K, V>>]) -> Option<Victim> {
    shards
        .iter()
        .enumerate()
        .filter_map(|(shard, lock)| lock.lock().lru_tick().map(|tick| Victim { shard, tick }))
        .min_by_key(|victim| victim.tick)
}
