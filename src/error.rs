//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Lookups of absent or expired keys are not errors; they return `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache configuration was rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Shorthand for building an [`CacheError::InvalidConfig`].
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        CacheError::InvalidConfig(msg.into())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
