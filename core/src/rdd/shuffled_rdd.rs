//! RDD that represents a shuffle dependency.

use crate::shuffle::{Aggregator, Partitioner};
use crate::traits::{BasicPartition, Data, Partition, RddBase, RddError, RddResult};
use rayon::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Map output of one shuffle, indexed `[reduce partition][map partition]`.
type ShuffleBlocks<K, C> = Vec<Vec<HashMap<K, C>>>;

/// ShuffledRdd is an RDD that has a shuffle dependency on its parent.
/// It is the result of operations like `reduce_by_key` and `combine_by_key`.
///
/// K: Key type
/// V: Value type of the parent RDD
/// C: Combiner type (output value type)
pub struct ShuffledRdd<K: Data, V: Data, C: Data> {
    id: usize,
    parent: Arc<dyn RddBase<(K, V)>>,
    aggregator: Arc<dyn Aggregator<K, V, C>>,
    partitioner: Arc<dyn Partitioner<K>>,
    blocks: OnceLock<ShuffleBlocks<K, C>>,
}

impl<K: Data, V: Data, C: Data> ShuffledRdd<K, V, C> {
    pub fn new(
        id: usize,
        parent: Arc<dyn RddBase<(K, V)>>,
        aggregator: Arc<dyn Aggregator<K, V, C>>,
        partitioner: Arc<dyn Partitioner<K>>,
    ) -> Self {
        Self {
            id,
            parent,
            aggregator,
            partitioner,
            blocks: OnceLock::new(),
        }
    }
}

impl<K, V, C> ShuffledRdd<K, V, C>
where
    K: Data + Hash + Eq,
    V: Data,
    C: Data,
{
    /// Map side of the shuffle for one parent partition: combine its values
    /// per key, bucketed by reduce partition.
    fn combine_map_output(&self, map_partition: usize) -> RddResult<Vec<HashMap<K, C>>> {
        let num_reduce = self.num_partitions();
        let mut buckets: Vec<HashMap<K, C>> = (0..num_reduce).map(|_| HashMap::new()).collect();

        for (key, value) in self.parent.compute(&BasicPartition::new(map_partition))? {
            let reduce_partition = self.partitioner.get_partition(&key) as usize;
            let bucket = buckets.get_mut(reduce_partition).ok_or_else(|| {
                RddError::ShuffleError(format!(
                    "partitioner returned {} for {} partitions",
                    reduce_partition, num_reduce
                ))
            })?;
            match bucket.remove(&key) {
                Some(c) => {
                    let merged = self.aggregator.merge_value(c, value);
                    bucket.insert(key, merged);
                }
                None => {
                    let c = self.aggregator.create_combiner(value);
                    bucket.insert(key, c);
                }
            }
        }
        Ok(buckets)
    }

    /// Computes every parent partition exactly once, in parallel.
    fn run_map_stage(&self) -> RddResult<ShuffleBlocks<K, C>> {
        let num_maps = self.parent.num_partitions();
        debug!(rdd_id = self.id, num_maps, "running shuffle map stage");

        let map_outputs = (0..num_maps)
            .into_par_iter()
            .map(|m| {
                self.combine_map_output(m)
                    .map_err(|e| RddError::ShuffleError(format!("map partition {}: {}", m, e)))
            })
            .collect::<RddResult<Vec<_>>>()?;

        let mut blocks: ShuffleBlocks<K, C> = (0..self.num_partitions())
            .map(|_| Vec::with_capacity(num_maps))
            .collect();
        for buckets in map_outputs {
            for (reduce_partition, bucket) in buckets.into_iter().enumerate() {
                blocks[reduce_partition].push(bucket);
            }
        }
        Ok(blocks)
    }

    fn blocks(&self) -> RddResult<&ShuffleBlocks<K, C>> {
        if let Some(blocks) = self.blocks.get() {
            return Ok(blocks);
        }
        let blocks = self.run_map_stage()?;
        Ok(self.blocks.get_or_init(|| blocks))
    }
}

impl<K, V, C> RddBase<(K, C)> for ShuffledRdd<K, V, C>
where
    K: Data + Hash + Eq,
    V: Data,
    C: Data,
{
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> &'static str {
        "shuffle"
    }

    fn num_partitions(&self) -> usize {
        self.partitioner.num_partitions() as usize
    }

    fn compute(&self, partition: &dyn Partition) -> RddResult<Vec<(K, C)>> {
        let map_outputs = self
            .blocks()?
            .get(partition.index())
            .ok_or(RddError::InvalidPartition(partition.index()))?;

        // Only partial combiners are merged here; values were combined map side.
        let mut reduced: HashMap<K, C> = HashMap::new();
        for map_output in map_outputs {
            for (key, combiner) in map_output {
                let merged = match reduced.remove(key) {
                    Some(existing) => self.aggregator.merge_combiners(existing, combiner.clone()),
                    None => combiner.clone(),
                };
                reduced.insert(key.clone(), merged);
            }
        }

        Ok(reduced.into_iter().collect())
    }

    fn run_shuffle_stages(&self) -> RddResult<()> {
        self.parent.run_shuffle_stages()?;
        self.blocks().map(|_| ())
    }

    fn lineage(&self) -> String {
        format!("{}[{}] <- {}", self.name(), self.id, self.parent.lineage())
    }
}
