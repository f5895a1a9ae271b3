//! Defines partitioners for distributing data in a shuffle.

use std::fmt::Debug;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Assigns every key to one of `num_partitions` reduce partitions.
///
/// Implementations must be deterministic: the same key always maps to the
/// same partition for the lifetime of the partitioner.
pub trait Partitioner<K>: Send + Sync + Debug {
    fn num_partitions(&self) -> u32;

    fn get_partition(&self, key: &K) -> u32;
}

/// A partitioner that uses the hash of the key to distribute data.
#[derive(Clone, Debug)]
pub struct HashPartitioner {
    num_partitions: u32,
    seed: u64,
}

impl HashPartitioner {
    pub fn new(num_partitions: u32) -> Self {
        Self::with_seed(num_partitions, 0)
    }

    pub fn with_seed(num_partitions: u32, seed: u64) -> Self {
        assert!(num_partitions > 0, "Number of partitions must be positive.");
        Self {
            num_partitions,
            seed,
        }
    }
}

impl<K: Hash + Send + Sync> Partitioner<K> for HashPartitioner {
    fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    fn get_partition(&self, key: &K) -> u32 {
        let mut s = DefaultHasher::new();
        self.seed.hash(&mut s);
        key.hash(&mut s);
        (s.finish() % self.num_partitions as u64) as u32
    }
}
