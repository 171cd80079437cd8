//! Entry weigher
//!
//! Assigns a cost to each entry. The cache keeps the sum of live entries'
//! weights at or below its configured maximum weight.

// == Weigher ==
/// Computes the cost of a cache entry.
///
/// Must be a pure function of the key and value.
pub trait Weigher<K, V>: Send + Sync + 'static {
    fn weigh(&self, key: &K, value: &V) -> u64;
}

impl<K, V, F> Weigher<K, V> for F
where
    F: Fn(&K, &V) -> u64 + Send + Sync + 'static,
{
    #[inline]
    fn weigh(&self, key: &K, value: &V) -> u64 {
        self(key, value)
    }
}

/// Every entry costs exactly 1 unit, so the maximum weight is an entry count.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitWeigher;

impl<K, V> Weigher<K, V> for UnitWeigher {
    #[inline]
    fn weigh(&self, _key: &K, _value: &V) -> u64 {
        1
    }
}

/// Every entry costs the same fixed amount.
#[derive(Debug, Clone, Copy)]
pub struct ConstantWeigher(pub u64);

impl<K, V> Weigher<K, V> for ConstantWeigher {
    #[inline]
    fn weigh(&self, _key: &K, _value: &V) -> u64 {
        self.0
    }
}
