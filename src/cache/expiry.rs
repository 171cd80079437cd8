//! Expiration Tracker
//!
//! Two independent TTL clocks: time since last write and time since last access.
//! An entry is expired as soon as either configured clock fires.

use std::time::{Duration, Instant};

use crate::cache::entry::CacheEntry;

// == Expiration ==
/// Time-based expiration settings of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expiration {
    after_write: Option<Duration>,
    after_access: Option<Duration>,
}

impl Expiration {
    /// Creates expiration settings from the two optional TTLs.
    pub fn new(after_write: Option<Duration>, after_access: Option<Duration>) -> Self {
        Self {
            after_write,
            after_access,
        }
    }

    /// TTL measured from the last write, if configured.
    pub fn after_write(&self) -> Option<Duration> {
        self.after_write
    }

    /// TTL measured from the last access, if configured.
    pub fn after_access(&self) -> Option<Duration> {
        self.after_access
    }

    /// Returns true if at least one clock is configured.
    pub fn is_enabled(&self) -> bool {
        self.after_write.is_some() || self.after_access.is_some()
    }

    // == Is Expired ==
    /// Checks whether an entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once the elapsed time is greater
    /// than or equal to the TTL.
    pub(crate) fn is_expired<V>(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        let write_fired = self
            .after_write
            .is_some_and(|ttl| entry.age(now) >= ttl);
        let access_fired = self
            .after_access
            .is_some_and(|ttl| entry.idle(now) >= ttl);
        write_fired || access_fired
    }

    // == Time To Live ==
    /// Remaining lifetime of an entry under the tighter of the two clocks.
    ///
    /// # Returns
    /// - `None` if no clock is configured (never expires)
    /// - `Some(Duration::ZERO)` if the entry has already expired
    /// - `Some(remaining)` otherwise
    pub(crate) fn time_to_live<V>(&self, entry: &CacheEntry<V>, now: Instant) -> Option<Duration> {
        let by_write = self
            .after_write
            .map(|ttl| ttl.saturating_sub(entry.age(now)));
        let by_access = self
            .after_access
            .map(|ttl| ttl.saturating_sub(entry.idle(now)));

        match (by_write, by_access) {
            (Some(w), Some(a)) => Some(w.min(a)),
            (w, a) => w.or(a),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(now: Instant) -> CacheEntry<&'static str> {
        CacheEntry::new("v", 1, now, 0)
    }

    #[test]
    fn test_disabled_never_expires() {
        let expiration = Expiration::default();
        let now = Instant::now();
        let entry = entry_at(now);

        assert!(!expiration.is_enabled());
        assert!(!expiration.is_expired(&entry, now + Duration::from_secs(86_400)));
        assert!(expiration.time_to_live(&entry, now).is_none());
    }

    #[test]
    fn test_after_write_boundary() {
        let expiration = Expiration::new(Some(Duration::from_secs(2)), None);
        let now = Instant::now();
        let entry = entry_at(now);

        assert!(!expiration.is_expired(&entry, now + Duration::from_millis(1999)));
        assert!(expiration.is_expired(&entry, now + Duration::from_secs(2)));
    }

    #[test]
    fn test_after_access_reset_by_touch() {
        let expiration = Expiration::new(None, Some(Duration::from_secs(2)));
        let now = Instant::now();
        let mut entry = entry_at(now);

        entry.touch(now + Duration::from_secs(1), 1);
        assert!(!expiration.is_expired(&entry, now + Duration::from_millis(2500)));
        assert!(expiration.is_expired(&entry, now + Duration::from_secs(3)));
    }

    #[test]
    fn test_either_clock_fires() {
        let expiration = Expiration::new(
            Some(Duration::from_secs(10)),
            Some(Duration::from_secs(2)),
        );
        let now = Instant::now();
        let mut entry = entry_at(now);

        // Access keeps the idle clock fresh, but the write clock still fires.
        for secs in 1..10 {
            entry.touch(now + Duration::from_secs(secs), secs);
        }
        assert!(!expiration.is_expired(&entry, now + Duration::from_millis(9500)));
        assert!(expiration.is_expired(&entry, now + Duration::from_secs(10)));
    }

    #[test]
    fn test_time_to_live_takes_minimum() {
        let expiration = Expiration::new(
            Some(Duration::from_secs(10)),
            Some(Duration::from_secs(3)),
        );
        let now = Instant::now();
        let entry = entry_at(now);

        assert_eq!(
            expiration.time_to_live(&entry, now + Duration::from_secs(1)),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            expiration.time_to_live(&entry, now + Duration::from_secs(5)),
            Some(Duration::ZERO)
        );
    }
}
