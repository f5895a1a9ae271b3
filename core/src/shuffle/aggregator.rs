//! Defines the Aggregator trait for combining values in shuffle operations.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Add;

/// Aggregator trait for combining values for a key.
/// Used in operations like `reduce_by_key` and `combine_by_key`.
///
/// K: Key type
/// V: Input value type
/// C: Combiner (intermediate/output) type
///
/// `merge_combiners` must be associative and commutative: partial combiners
/// built from any split of the input are merged in no particular order.
pub trait Aggregator<K, V, C>: Send + Sync + Debug {
    /// Create a combiner from the first value for a key.
    fn create_combiner(&self, v: V) -> C;

    /// Merge a new value into an existing combiner.
    fn merge_value(&self, c: C, v: V) -> C;

    /// Merge two combiners.
    fn merge_combiners(&self, c1: C, c2: C) -> C;
}

/// A simple aggregator for reduce_by_key operations where the combiner type is the same as the value type
#[derive(Clone, Debug)]
pub struct ReduceAggregator<V> {
    reduce_func: fn(V, V) -> V,
}

impl<V> ReduceAggregator<V> {
    pub fn new(reduce_func: fn(V, V) -> V) -> Self {
        Self { reduce_func }
    }
}

impl<K, V> Aggregator<K, V, V> for ReduceAggregator<V>
where
    V: Send + Sync + Debug + 'static,
{
    fn create_combiner(&self, v: V) -> V {
        v
    }

    fn merge_value(&self, c: V, v: V) -> V {
        (self.reduce_func)(c, v)
    }

    fn merge_combiners(&self, c1: V, c2: V) -> V {
        (self.reduce_func)(c1, c2)
    }
}

/// Average aggregator that keeps a running `(sum, count)` per key
#[derive(Clone, Debug)]
pub struct AverageAggregator<V> {
    _phantom: std::marker::PhantomData<fn(V)>,
}

impl<V> AverageAggregator<V> {
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<V> Default for AverageAggregator<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Combiner for average calculation: (sum, count)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AverageCombiner<V> {
    pub sum: V,
    pub count: u64,
}

impl AverageCombiner<i64> {
    /// `sum / count`. A combiner always holds at least one value.
    pub fn mean(&self) -> f64 {
        self.sum as f64 / self.count as f64
    }
}

impl<K, V> Aggregator<K, V, AverageCombiner<V>> for AverageAggregator<V>
where
    V: Send + Sync + Debug + Add<Output = V> + 'static,
{
    fn create_combiner(&self, v: V) -> AverageCombiner<V> {
        AverageCombiner { sum: v, count: 1 }
    }

    fn merge_value(&self, c: AverageCombiner<V>, v: V) -> AverageCombiner<V> {
        AverageCombiner {
            sum: c.sum + v,
            count: c.count + 1,
        }
    }

    fn merge_combiners(
        &self,
        c1: AverageCombiner<V>,
        c2: AverageCombiner<V>,
    ) -> AverageCombiner<V> {
        AverageCombiner {
            sum: c1.sum + c2.sum,
            count: c1.count + c2.count,
        }
    }
}
