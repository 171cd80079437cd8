//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Maintenance: sweeps expired entries and re-checks the weight bound

mod maintenance;

pub use maintenance::spawn_maintenance_task;
