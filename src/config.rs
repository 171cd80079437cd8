//! Configuration Module
//!
//! Handles loading the cache and driver configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{
    Cache, ConstantWeigher, DEFAULT_SHARD_COUNT, REFERENCE_ENTRY_WEIGHT, REFERENCE_MAX_WEIGHT,
    REFERENCE_TTL_SECS,
};
use crate::error::{CacheError, Result};

/// Cache and driver configuration parameters.
///
/// Values are kept signed as read so that out-of-range input is reported by
/// [`Config::build_cache`] instead of being silently wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on the sum of entry weights
    pub max_weight: i64,
    /// Weight assigned to every entry
    pub entry_weight: i64,
    /// TTL in seconds since last write, None = disabled
    pub expire_after_write_secs: Option<i64>,
    /// TTL in seconds since last access, None = disabled
    pub expire_after_access_secs: Option<i64>,
    /// Whether hit/miss/eviction counters are recorded
    pub record_stats: bool,
    /// Number of independently locked shards
    pub shards: usize,
    /// Background maintenance interval in seconds
    pub maintenance_interval: u64,
    /// Driver: number of reader threads
    pub reader_threads: usize,
    /// Driver: number of writer threads
    pub writer_threads: usize,
    /// Driver: number of distinct keys
    pub unique_keys: u64,
    /// Driver: passes each thread makes over its keys
    pub rounds: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_WEIGHT` - Maximum total weight (default: 209715200)
    /// - `CACHE_ENTRY_WEIGHT` - Weight of every entry (default: 80)
    /// - `CACHE_EXPIRE_AFTER_WRITE_SECS` - Write TTL, `off` disables (default: 7200)
    /// - `CACHE_EXPIRE_AFTER_ACCESS_SECS` - Access TTL, `off` disables (default: 7200)
    /// - `CACHE_RECORD_STATS` - Record statistics (default: true)
    /// - `CACHE_SHARDS` - Shard count (default: 64)
    /// - `MAINTENANCE_INTERVAL_SECS` - Maintenance frequency in seconds (default: 1)
    /// - `READER_THREADS` / `WRITER_THREADS` - Driver threads (default: 9 / 1)
    /// - `UNIQUE_KEYS` - Driver key space (default: 1000)
    /// - `ROUNDS` - Driver passes per thread (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_weight: parse_var("CACHE_MAX_WEIGHT").unwrap_or(defaults.max_weight),
            entry_weight: parse_var("CACHE_ENTRY_WEIGHT").unwrap_or(defaults.entry_weight),
            expire_after_write_secs: parse_ttl_var("CACHE_EXPIRE_AFTER_WRITE_SECS")
                .unwrap_or(defaults.expire_after_write_secs),
            expire_after_access_secs: parse_ttl_var("CACHE_EXPIRE_AFTER_ACCESS_SECS")
                .unwrap_or(defaults.expire_after_access_secs),
            record_stats: parse_var("CACHE_RECORD_STATS").unwrap_or(defaults.record_stats),
            shards: parse_var("CACHE_SHARDS").unwrap_or(defaults.shards),
            maintenance_interval: parse_var("MAINTENANCE_INTERVAL_SECS")
                .unwrap_or(defaults.maintenance_interval),
            reader_threads: parse_var("READER_THREADS").unwrap_or(defaults.reader_threads),
            writer_threads: parse_var("WRITER_THREADS").unwrap_or(defaults.writer_threads),
            unique_keys: parse_var("UNIQUE_KEYS").unwrap_or(defaults.unique_keys),
            rounds: parse_var("ROUNDS").unwrap_or(defaults.rounds),
        }
    }

    /// Interval between background maintenance passes.
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval.max(1))
    }

    /// Validates the cache settings and builds the cache they describe.
    pub fn build_cache(&self) -> Result<Cache<u64, String>> {
        let max_weight = positive("CACHE_MAX_WEIGHT", self.max_weight)?;
        let entry_weight = positive("CACHE_ENTRY_WEIGHT", self.entry_weight)?;

        let mut builder = Cache::builder(max_weight)
            .weigher(ConstantWeigher(entry_weight))
            .shards(self.shards);
        if self.record_stats {
            builder = builder.record_stats();
        }
        if let Some(secs) = self.expire_after_write_secs {
            builder = builder.expire_after_write(ttl("CACHE_EXPIRE_AFTER_WRITE_SECS", secs)?);
        }
        if let Some(secs) = self.expire_after_access_secs {
            builder = builder.expire_after_access(ttl("CACHE_EXPIRE_AFTER_ACCESS_SECS", secs)?);
        }
        builder.build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_weight: REFERENCE_MAX_WEIGHT as i64,
            entry_weight: REFERENCE_ENTRY_WEIGHT as i64,
            expire_after_write_secs: Some(REFERENCE_TTL_SECS as i64),
            expire_after_access_secs: Some(REFERENCE_TTL_SECS as i64),
            record_stats: true,
            shards: DEFAULT_SHARD_COUNT,
            maintenance_interval: 1,
            reader_threads: 9,
            writer_threads: 1,
            unique_keys: 1000,
            rounds: 100,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// `Some(None)` for `off`, `Some(Some(secs))` for a number, `None` if unset or unparseable.
fn parse_ttl_var(name: &str) -> Option<Option<i64>> {
    let raw = env::var(name).ok()?;
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("off") {
        Some(None)
    } else {
        raw.parse().ok().map(Some)
    }
}

fn positive(name: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| CacheError::invalid_config(format!("{name} must be positive, got {value}")))
}

fn ttl(name: &str, secs: i64) -> Result<Duration> {
    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| CacheError::invalid_config(format!("{name} must not be negative, got {secs}")))
}
