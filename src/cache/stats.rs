//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, loads, evictions and
//! expirations.
//!
//! Counter policy: a SIZE removal increments `eviction_count` and
//! `eviction_weight`; an EXPIRED removal increments `expiration_count`;
//! EXPLICIT and REPLACED removals are not counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

// == Stats Counter ==
/// Lock-free recorder shared by every thread using the cache.
///
/// When disabled every `record_*` call is a no-op.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    total_load_time_ns: AtomicU64,
    evictions: AtomicU64,
    eviction_weight: AtomicU64,
    expirations: AtomicU64,
}

impl StatsCounter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    fn add(&self, counter: &AtomicU64, n: u64) {
        if self.enabled {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn record_hit(&self) {
        self.add(&self.hits, 1);
    }

    pub fn record_miss(&self) {
        self.add(&self.misses, 1);
    }

    pub fn record_load_success(&self, elapsed: Duration) {
        self.add(&self.load_successes, 1);
        self.add(&self.total_load_time_ns, duration_ns(elapsed));
    }

    pub fn record_load_failure(&self, elapsed: Duration) {
        self.add(&self.load_failures, 1);
        self.add(&self.total_load_time_ns, duration_ns(elapsed));
    }

    pub fn record_eviction(&self, weight: u64) {
        self.add(&self.evictions, 1);
        self.add(&self.eviction_weight, weight);
    }

    pub fn record_expiration(&self) {
        self.add(&self.expirations, 1);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self, entry_count: usize, weighted_size: u64) -> CacheStats {
        CacheStats {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            load_success_count: self.load_successes.load(Ordering::Relaxed),
            load_failure_count: self.load_failures.load(Ordering::Relaxed),
            total_load_time_ns: self.total_load_time_ns.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            eviction_weight: self.eviction_weight.load(Ordering::Relaxed),
            expiration_count: self.expirations.load(Ordering::Relaxed),
            entry_count,
            weighted_size,
        }
    }
}

fn duration_ns(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

// == Cache Stats ==
/// Snapshot of cache performance metrics.
///
/// Counters are monotonic for the lifetime of the cache; `entry_count` and
/// `weighted_size` are gauges taken at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of lookups that returned a live value
    pub hit_count: u64,
    /// Number of lookups that found nothing (absent or expired)
    pub miss_count: u64,
    /// Number of values successfully computed by a loader
    pub load_success_count: u64,
    /// Number of loaders that returned an error
    pub load_failure_count: u64,
    /// Total nanoseconds spent in loaders
    pub total_load_time_ns: u64,
    /// Number of entries evicted because of the weight bound
    pub eviction_count: u64,
    /// Total weight of entries evicted because of the weight bound
    pub eviction_weight: u64,
    /// Number of entries removed because a TTL elapsed
    pub expiration_count: u64,
    /// Current number of entries in the cache
    pub entry_count: usize,
    /// Current sum of entry weights
    pub weighted_size: u64,
}

impl CacheStats {
    /// Total number of lookups (hits + misses).
    pub fn request_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 1.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.request_count();
        if total == 0 {
            1.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }

    /// Returns misses / (hits + misses), or 0.0 if no requests have been made.
    pub fn miss_rate(&self) -> f64 {
        let total = self.request_count();
        if total == 0 {
            0.0
        } else {
            self.miss_count as f64 / total as f64
        }
    }

    /// Total number of loader invocations.
    pub fn load_count(&self) -> u64 {
        self.load_success_count + self.load_failure_count
    }

    /// Average time spent per load, or zero if nothing was loaded.
    pub fn average_load_penalty(&self) -> Duration {
        match self.load_count() {
            0 => Duration::ZERO,
            n => Duration::from_nanos(self.total_load_time_ns / n),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StatsCounter::new(true).snapshot(0, 0);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.miss_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counter = StatsCounter::new(true);
        counter.record_hit();
        counter.record_hit();
        counter.record_hit();
        counter.record_miss();

        let stats = counter.snapshot(0, 0);
        assert_eq!(stats.request_count(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.miss_rate(), 0.25);
    }

    #[test]
    fn test_disabled_counter_records_nothing() {
        let counter = StatsCounter::new(false);
        counter.record_hit();
        counter.record_miss();
        counter.record_eviction(80);
        counter.record_expiration();
        counter.record_load_success(Duration::from_millis(1));

        let stats = counter.snapshot(3, 240);
        assert_eq!(stats.request_count(), 0);
        assert_eq!(stats.eviction_count, 0);
        assert_eq!(stats.expiration_count, 0);
        assert_eq!(stats.load_count(), 0);
        // Gauges are still reported
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.weighted_size, 240);
    }

    #[test]
    fn test_record_eviction() {
        let counter = StatsCounter::new(true);
        counter.record_eviction(80);
        counter.record_eviction(20);

        let stats = counter.snapshot(0, 0);
        assert_eq!(stats.eviction_count, 2);
        assert_eq!(stats.eviction_weight, 100);
        assert_eq!(stats.expiration_count, 0);
    }

    #[test]
    fn test_average_load_penalty() {
        let counter = StatsCounter::new(true);
        counter.record_load_success(Duration::from_nanos(300));
        counter.record_load_failure(Duration::from_nanos(100));

        let stats = counter.snapshot(0, 0);
        assert_eq!(stats.load_count(), 2);
        assert_eq!(stats.average_load_penalty(), Duration::from_nanos(200));
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = CacheStats {
            hit_count: 9,
            miss_count: 1,
            ..CacheStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["hit_count"], 9);
        assert_eq!(json["miss_count"], 1);
    }
}
