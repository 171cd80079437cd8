//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against a sequential model.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{Cache, CacheBuilder, ConstantWeigher, GlobalCache, RemovalCause};

// == Test Configuration ==
const ENTRY_WEIGHT: u64 = 80;

type Events = Arc<Mutex<Vec<(u64, RemovalCause)>>>;

fn counting_builder(max_entries: u64) -> (CacheBuilder<u64, String>, Events) {
    let events: Events = Arc::default();
    let sink = events.clone();
    let builder = Cache::<u64, String>::builder(max_entries * ENTRY_WEIGHT)
        .weigher(ConstantWeigher(ENTRY_WEIGHT))
        .record_stats()
        .shards(8)
        .removal_listener(move |k: u64, _: String, c: RemovalCause| sink.lock().push((k, c)));
    (builder, events)
}

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = u64> {
    0u64..64
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}"
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: u64, value: String },
    Merge { key: u64, value: String },
    Get { key: u64 },
    Invalidate { key: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Merge { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every get records exactly one hit or miss.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let (builder, _) = counting_builder(16);
        let cache = builder.build().unwrap();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => cache.put(key, value),
                CacheOp::Merge { key, value } => cache.put_or_merge(key, value),
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Invalidate { key } => {
                    cache.invalidate(&key);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hit_count, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.miss_count, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.entry_count, cache.entry_count(), "Entry count mismatch");
    }

    // Without capacity pressure the cache behaves like a map.
    #[test]
    fn prop_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let (builder, _) = counting_builder(1024);
        let cache = builder.build().unwrap();
        let mut model: HashMap<u64, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Put { key, value } | CacheOp::Merge { key, value } => {
                    cache.put_or_merge(key, value.clone());
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(&key).cloned());
                }
                CacheOp::Invalidate { key } => {
                    prop_assert_eq!(cache.invalidate(&key), model.remove(&key));
                }
            }
        }

        prop_assert_eq!(cache.entry_count(), model.len());
        prop_assert_eq!(cache.weighted_size(), model.len() as u64 * ENTRY_WEIGHT);
    }

    // Round-trip: a write is immediately visible.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let (builder, _) = counting_builder(16);
        let cache = builder.build().unwrap();

        cache.put_or_merge(key, value.clone());
        prop_assert_eq!(cache.get_if_present(&key), Some(value));
    }

    // The weight bound holds after every write, and weight accounting agrees
    // with a full audit of the shards.
    #[test]
    fn prop_weight_bound_enforced(
        max_entries in 1u64..20,
        ops in prop::collection::vec(cache_op_strategy(), 1..200)
    ) {
        let (builder, _) = counting_builder(max_entries);
        let cache = builder.build().unwrap();

        for op in ops {
            match op {
                CacheOp::Put { key, value } => cache.put(key, value),
                CacheOp::Merge { key, value } => cache.put_or_merge(key, value),
                CacheOp::Get { key } => {
                    cache.get(&key);
                }
                CacheOp::Invalidate { key } => {
                    cache.invalidate(&key);
                }
            }
            prop_assert!(
                cache.weighted_size() <= cache.max_weight(),
                "Weight {} exceeds max {}",
                cache.weighted_size(),
                cache.max_weight()
            );
            prop_assert_eq!(cache.audit_weighted_size(), cache.weighted_size());
        }
    }

    // Each removal is reported once, and size removals match the eviction counter.
    #[test]
    fn prop_removal_events_balance(
        keys in prop::collection::vec(key_strategy(), 1..200)
    ) {
        let (builder, events) = counting_builder(8);
        let cache = builder.build().unwrap();

        for key in &keys {
            cache.put(*key, format!("value_{key}"));
        }

        let events = events.lock();
        let size_events = events.iter().filter(|(_, c)| *c == RemovalCause::Size).count() as u64;
        let replaced = events.iter().filter(|(_, c)| *c == RemovalCause::Replaced).count();

        prop_assert_eq!(size_events, cache.stats().eviction_count);
        // Every write either created an entry still present, replaced one, or
        // created one that was later evicted.
        prop_assert_eq!(
            keys.len(),
            cache.entry_count() + replaced + size_events as usize
        );
    }
}

// Property tests for LRU eviction behavior
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // When a full cache admits a new key, the least recently used key leaves.
    #[test]
    fn prop_lru_eviction_order(
        capacity in 2u64..12,
        accessed in prop::collection::vec(0u64..12, 0..10)
    ) {
        let (builder, events) = counting_builder(capacity);
        let cache = builder.build().unwrap();

        for key in 0..capacity {
            cache.put(key, format!("value_{key}"));
        }

        // Replay reads on the model: most recently used at the back
        let mut order: Vec<u64> = (0..capacity).collect();
        for key in accessed.into_iter().filter(|k| *k < capacity) {
            cache.get(&key);
            order.retain(|k| *k != key);
            order.push(key);
        }

        cache.put(capacity, "new".to_string());

        prop_assert_eq!(cache.entry_count() as u64, capacity);
        prop_assert_eq!(events.lock().clone(), vec![(order[0], RemovalCause::Size)]);
        prop_assert!(!cache.contains_key(&order[0]));
        for key in order.iter().skip(1) {
            prop_assert!(cache.contains_key(key), "Key {} should still exist", key);
        }
    }
}

// == Property Test for Concurrent Operation Correctness ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Concurrent writers never produce a value nobody wrote.
    #[test]
    fn prop_concurrent_merge_keeps_a_written_value(
        writers in 2usize..8,
        rounds in 1usize..50,
    ) {
        let (builder, _) = counting_builder(64);
        let cache = Arc::new(builder.build().unwrap());

        tokio_test::block_on(async {
            let handles: Vec<_> = (0..writers)
                .map(|id| {
                    let cache = cache.clone();
                    tokio::task::spawn_blocking(move || {
                        for round in 0..rounds {
                            cache.put_or_merge(0, format!("{id}:{round}"));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.await.expect("Writer should not panic");
            }
        });

        let value = cache.get(&0).expect("Key should be present");
        let last_writes: Vec<String> = (0..writers).map(|id| format!("{id}:{}", rounds - 1)).collect();
        prop_assert!(last_writes.contains(&value), "Unexpected value {}", value);
        prop_assert_eq!(cache.entry_count(), 1);
    }
}
