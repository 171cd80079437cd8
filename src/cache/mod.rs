//! Cache Module
//!
//! Provides a bounded, weight-limited concurrent cache with TTL expiration and
//! LRU eviction.

mod builder;
mod entry;
mod expiry;
mod global;
mod listener;
mod lru;
mod shard;
mod stats;
mod store;
mod weigher;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use builder::CacheBuilder;
pub use expiry::Expiration;
pub use global::{reference_cache, GlobalCache};
pub use listener::{RemovalCause, RemovalListener};
pub use stats::CacheStats;
pub use store::{Cache, Maintenance};
pub use weigher::{ConstantWeigher, UnitWeigher, Weigher};

// == Public Constants ==
/// Number of shards used unless the builder says otherwise
pub const DEFAULT_SHARD_COUNT: usize = 64;

/// Maximum weight of the reference configuration (200 MiB worth of cost units)
pub const REFERENCE_MAX_WEIGHT: u64 = 200 * 1024 * 1024;

/// Weight of every entry in the reference configuration
pub const REFERENCE_ENTRY_WEIGHT: u64 = 80;

/// Write and access TTL of the reference configuration (2 hours)
pub const REFERENCE_TTL_SECS: u64 = 2 * 60 * 60;
