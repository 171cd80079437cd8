//! Bounded Cache - A weight-limited concurrent in-memory cache
//!
//! Provides a sharded key-value cache with write/access TTL expiration, LRU
//! eviction, removal notification and statistics.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;
pub mod workload;

pub use cache::{reference_cache, Cache, CacheBuilder, CacheStats, GlobalCache, RemovalCause};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_maintenance_task;
