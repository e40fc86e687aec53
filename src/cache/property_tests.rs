//! Property-Based Tests for the In-Process Backend
//!
//! Uses proptest to verify the backend contract over generated operation
//! sequences.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::cache::{CacheBackend, MemoryCache, PutOptions};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: u64 = 300;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("test runtime")
}

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

/// Generates JSON payload values
fn value_strategy() -> impl Strategy<Value = Value> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| json!({ "data": s }))
}

/// A sequence of backend operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: Value },
    Get { key: String },
    Invalidate { tag: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        "[a-z]{1,8}".prop_map(|tag| CacheOp::Invalidate { tag }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // *For any* sequence of operations, the hit and miss counters SHALL
    // reflect exactly the lookups that found or did not find a live entry.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        runtime().block_on(async {
            let cache = MemoryCache::new(TEST_MAX_ENTRIES);
            let mut expected_hits: u64 = 0;
            let mut expected_misses: u64 = 0;

            for op in ops {
                match op {
                    CacheOp::Put { key, value } => {
                        cache.put(&key, value, PutOptions::ttl(TEST_TTL)).await.unwrap();
                    }
                    CacheOp::Get { key } => {
                        match cache.get(&key, None).await.unwrap() {
                            Some(_) => expected_hits += 1,
                            None => expected_misses += 1,
                        }
                    }
                    CacheOp::Invalidate { tag } => {
                        cache.invalidate(&[tag]).await.unwrap();
                    }
                }
            }

            let stats = cache.stats().await;
            assert_eq!(stats.hits, expected_hits, "hits mismatch");
            assert_eq!(stats.misses, expected_misses, "misses mismatch");
            assert_eq!(stats.total_entries, cache.len().await, "total entries mismatch");
        });
    }

    // *For any* key and value, a put followed immediately by a get SHALL
    // return a value deep-equal to the one stored.
    #[test]
    fn prop_round_trip_consistency(key in valid_key_strategy(), value in value_strategy()) {
        runtime().block_on(async {
            let cache = MemoryCache::new(TEST_MAX_ENTRIES);

            cache.put(&key, value.clone(), PutOptions::ttl(TEST_TTL)).await.unwrap();
            let fetched = cache.get(&key, None).await.unwrap();

            assert_eq!(fetched, Some(value));
        });
    }

    // *For any* two disjoint key sets stored under disjoint tags,
    // invalidating one tag SHALL remove exactly that tag's entries.
    #[test]
    fn prop_tag_invalidation_isolation(
        keys_a in prop::collection::hash_set(valid_key_strategy(), 1..10),
        keys_b in prop::collection::hash_set(valid_key_strategy(), 1..10),
    ) {
        runtime().block_on(async {
            let cache = MemoryCache::new(TEST_MAX_ENTRIES);

            // Prefixes keep the two key sets disjoint
            let keys_a: Vec<String> = keys_a.iter().map(|k| format!("a_{}", k)).collect();
            let keys_b: Vec<String> = keys_b.iter().map(|k| format!("b_{}", k)).collect();

            for key in &keys_a {
                cache
                    .put(key, json!(1), PutOptions::new(TEST_TTL, vec!["tag_a".to_string()]))
                    .await
                    .unwrap();
            }
            for key in &keys_b {
                cache
                    .put(key, json!(2), PutOptions::new(TEST_TTL, vec!["tag_b".to_string()]))
                    .await
                    .unwrap();
            }

            let removed = cache.invalidate(&["tag_a".to_string()]).await.unwrap();
            assert_eq!(removed, keys_a.len());

            for key in &keys_a {
                assert!(cache.get(key, None).await.unwrap().is_none());
            }
            for key in &keys_b {
                assert!(cache.get(key, None).await.unwrap().is_some());
            }
        });
    }

    // *For any* operation sequence, the entry count SHALL never exceed the
    // configured capacity bound.
    #[test]
    fn prop_capacity_bound_holds(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        runtime().block_on(async {
            let cache = MemoryCache::new(10);

            for op in ops {
                match op {
                    CacheOp::Put { key, value } => {
                        cache.put(&key, value, PutOptions::ttl(TEST_TTL)).await.unwrap();
                    }
                    CacheOp::Get { key } => {
                        cache.get(&key, None).await.unwrap();
                    }
                    CacheOp::Invalidate { tag } => {
                        cache.invalidate(&[tag]).await.unwrap();
                    }
                }
                assert!(cache.len().await <= 10, "capacity bound violated");
            }
        });
    }
}
