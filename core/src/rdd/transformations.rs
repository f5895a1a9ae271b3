//! RDD transformation implementations.

use crate::rdd::{Rdd, ShuffledRdd};
use crate::shuffle::{Aggregator, HashPartitioner, Partitioner, ReduceAggregator};
use crate::traits::{Data, RddResult};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// An extension trait for RDDs of key-value pairs.
pub trait PairRdd<K, V>
where
    K: Data + Hash + Eq,
    V: Data,
{
    /// Applies `func` to every value, keeping keys and partitioning unchanged.
    fn map_values<U, F>(&self, func: F) -> Rdd<(K, U)>
    where
        U: Data,
        F: Fn(V) -> U + Send + Sync + 'static;

    /// Merges the values for each key with an associative and commutative
    /// function, hash-partitioning the result into `num_partitions`
    /// partitions (at least one).
    /// This is a wide transformation that triggers a shuffle.
    fn reduce_by_key(&self, reduce_func: fn(V, V) -> V, num_partitions: usize) -> Rdd<(K, V)>;

    /// Same as [`PairRdd::reduce_by_key`] with an explicit partitioner.
    fn reduce_by_key_with_partitioner(
        &self,
        reduce_func: fn(V, V) -> V,
        partitioner: Arc<dyn Partitioner<K>>,
    ) -> Rdd<(K, V)>;

    /// Combine values with the same key using a custom aggregator.
    fn combine_by_key<C: Data>(
        &self,
        aggregator: Arc<dyn Aggregator<K, V, C>>,
        partitioner: Arc<dyn Partitioner<K>>,
    ) -> Rdd<(K, C)>;

    /// Collects the pairs into a map. With duplicate keys the last pair in
    /// partition order wins.
    fn collect_as_map(&self) -> RddResult<HashMap<K, V>>;
}

impl<K, V> PairRdd<K, V> for Rdd<(K, V)>
where
    K: Data + Hash + Eq,
    V: Data,
{
    fn map_values<U, F>(&self, func: F) -> Rdd<(K, U)>
    where
        U: Data,
        F: Fn(V) -> U + Send + Sync + 'static,
    {
        self.map(move |(k, v)| (k, func(v)))
    }

    fn reduce_by_key(&self, reduce_func: fn(V, V) -> V, num_partitions: usize) -> Rdd<(K, V)> {
        let num_partitions = u32::try_from(num_partitions.max(1)).unwrap_or(u32::MAX);
        self.reduce_by_key_with_partitioner(reduce_func, Arc::new(HashPartitioner::new(num_partitions)))
    }

    fn reduce_by_key_with_partitioner(
        &self,
        reduce_func: fn(V, V) -> V,
        partitioner: Arc<dyn Partitioner<K>>,
    ) -> Rdd<(K, V)> {
        let aggregator: Arc<dyn Aggregator<K, V, V>> = Arc::new(ReduceAggregator::new(reduce_func));
        self.combine_by_key(aggregator, partitioner)
    }

    fn combine_by_key<C: Data>(
        &self,
        aggregator: Arc<dyn Aggregator<K, V, C>>,
        partitioner: Arc<dyn Partitioner<K>>,
    ) -> Rdd<(K, C)> {
        let node = ShuffledRdd::new(
            self.context.new_rdd_id(),
            Arc::clone(&self.node),
            aggregator,
            partitioner,
        );
        Rdd::from_node(self.context.clone(), Arc::new(node))
    }

    fn collect_as_map(&self) -> RddResult<HashMap<K, V>> {
        Ok(self.collect()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextConfig, TallyContext};
    use crate::shuffle::{AverageAggregator, AverageCombiner};

    fn context() -> TallyContext {
        TallyContext::new(ContextConfig::new("pair-test").with_parallelism(3)).unwrap()
    }

    fn pairs() -> Vec<(String, i64)> {
        vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2),
            ("a".to_string(), 3),
            ("c".to_string(), 4),
            ("b".to_string(), 5),
        ]
    }

    #[test]
    fn test_reduce_by_key_sums() {
        let context = context();
        let rdd = context.parallelize_with_partitions(pairs(), 2);
        let reduced = rdd.reduce_by_key(|a, b| a + b, 2);
        assert_eq!(reduced.num_partitions(), 2);

        let map = reduced.collect_as_map().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["a"], 4);
        assert_eq!(map["b"], 7);
        assert_eq!(map["c"], 4);
    }

    #[test]
    fn test_reduce_by_key_zero_partitions() {
        let context = context();
        let reduced = context.parallelize(pairs()).reduce_by_key(|a, b| a + b, 0);
        assert_eq!(reduced.num_partitions(), 1);
        assert_eq!(reduced.count().unwrap(), 3);
    }

    #[test]
    fn test_keys_land_in_one_partition() {
        let context = context();
        let reduced = context
            .parallelize_with_partitions(pairs(), 3)
            .reduce_by_key(|a, b| a + b, 3);

        let partitions = reduced.collect_partitions().unwrap();
        let mut seen: Vec<String> = partitions.into_iter().flatten().map(|(k, _)| k).collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_map_values() {
        let context = context();
        let rdd = context.parallelize(pairs());
        let doubled = rdd.map_values(|v| v * 2).collect().unwrap();
        assert_eq!(doubled[0], ("a".to_string(), 2));
        assert_eq!(doubled.len(), 5);
    }

    #[test]
    fn test_combine_by_key_average() {
        let context = context();
        let aggregator: Arc<dyn Aggregator<String, i64, AverageCombiner<i64>>> =
            Arc::new(AverageAggregator::<i64>::new());
        let averages = context
            .parallelize_with_partitions(pairs(), 3)
            .combine_by_key(aggregator, Arc::new(HashPartitioner::new(2)))
            .map_values(|c| c.mean())
            .collect_as_map()
            .unwrap();

        assert_eq!(averages["a"], 2.0);
        assert_eq!(averages["b"], 3.5);
        assert_eq!(averages["c"], 4.0);
    }
}
