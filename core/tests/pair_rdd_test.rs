//! Key-value reductions over different partitionings

mod common;

use common::{create_test_context, create_test_string_i64_data};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tally_core::PairRdd;
use tally_core::shuffle::{Aggregator, AverageAggregator, AverageCombiner, HashPartitioner};

fn sum_pairs(a: (i64, u64), b: (i64, u64)) -> (i64, u64) {
    (a.0 + b.0, a.1 + b.1)
}

fn expected_sums(data: &[(String, i64)]) -> HashMap<String, i64> {
    let mut sums = HashMap::new();
    for (k, v) in data {
        *sums.entry(k.clone()).or_insert(0) += v;
    }
    sums
}

#[test]
fn test_reduce_by_key_independent_of_partitioning() {
    let context = create_test_context("partitioning");
    let data = create_test_string_i64_data();
    let expected = expected_sums(&data);

    for input_partitions in [1, 3, 8] {
        for output_partitions in [1, 3, 8] {
            let rdd = context.parallelize_with_partitions(data.clone(), input_partitions);
            let sums = rdd
                .reduce_by_key(|a, b| a + b, output_partitions)
                .collect_as_map()
                .unwrap();
            assert_eq!(
                sums, expected,
                "input={} output={}",
                input_partitions, output_partitions
            );
        }
    }
}

#[test]
fn test_average_via_pairs_matches_combine_by_key() {
    let context = create_test_context("averages");
    let rdd = context.parallelize_with_partitions(create_test_string_i64_data(), 3);

    let via_pairs = rdd
        .map_values(|v| (v, 1u64))
        .reduce_by_key(sum_pairs, 4)
        .map_values(|(sum, count)| sum as f64 / count as f64)
        .collect_as_map()
        .unwrap();

    let aggregator: Arc<dyn Aggregator<String, i64, AverageCombiner<i64>>> =
        Arc::new(AverageAggregator::<i64>::new());
    let via_combiner = rdd
        .combine_by_key(aggregator, Arc::new(HashPartitioner::new(2)))
        .map_values(|c| c.mean())
        .collect_as_map()
        .unwrap();

    assert_eq!(via_pairs.len(), 5);
    for (key, avg) in &via_pairs {
        assert!((avg - via_combiner[key]).abs() < 1e-9, "key {}", key);
    }
}

#[test]
fn test_reduce_on_empty_input() {
    let context = create_test_context("empty");
    let rdd = context.parallelize(Vec::<(String, i64)>::new());
    let reduced = rdd.reduce_by_key(|a, b| a + b, 3);
    assert_eq!(reduced.count().unwrap(), 0);
    assert!(reduced.collect_as_map().unwrap().is_empty());
}

#[test]
fn test_filter_then_count() {
    let context = create_test_context("filter");
    let rdd = context.parallelize_with_partitions((1..=100i64).collect(), 7);
    assert_eq!(rdd.filter(|v| *v > 50).count().unwrap(), 50);
    assert!(rdd.filter(|v| *v > 50).lineage().starts_with("filter["));
}

#[test]
fn test_shuffle_computes_parent_once_per_action() {
    let context = create_test_context("map-stage");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let data = create_test_string_i64_data();
    let reduced = context
        .parallelize_with_partitions(data.clone(), 4)
        .map(move |pair| {
            counter.fetch_add(1, Ordering::SeqCst);
            pair
        })
        .reduce_by_key(|a, b| a + b, 8);

    assert_eq!(reduced.collect_as_map().unwrap(), expected_sums(&data));
    assert_eq!(calls.load(Ordering::SeqCst), data.len());

    // The shuffle output is kept, so a second action does not recompute the map side.
    assert_eq!(reduced.count().unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), data.len());
}
