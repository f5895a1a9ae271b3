//! RDD Actions
//!
//! This module contains action implementations for RDDs.
//! Actions trigger computation and return results to the driver program.
//! Shuffle map stages run first, then the partitions are computed in
//! parallel on the context's worker pool.

use crate::rdd::Rdd;
use crate::traits::{Data, RddResult};
use rayon::prelude::*;
use tracing::debug;

impl<T: Data> Rdd<T> {
    /// Computes every partition in parallel, returning them in partition order.
    pub fn collect_partitions(&self) -> RddResult<Vec<Vec<T>>> {
        self.context.ensure_active()?;
        let node = &self.node;
        let partitions = node.partitions();
        debug!(
            rdd_id = node.id(),
            num_partitions = partitions.len(),
            lineage = %node.lineage(),
            "running job"
        );

        self.context.install(|| -> RddResult<Vec<Vec<T>>> {
            node.run_shuffle_stages()?;
            partitions.par_iter().map(|p| node.compute(p)).collect()
        })
    }

    /// Collect all elements of the RDD into a vector
    pub fn collect(&self) -> RddResult<Vec<T>> {
        Ok(self.collect_partitions()?.into_iter().flatten().collect())
    }

    /// Count the number of elements in the RDD
    pub fn count(&self) -> RddResult<usize> {
        self.context.ensure_active()?;
        let node = &self.node;
        let partitions = node.partitions();

        self.context.install(|| -> RddResult<usize> {
            node.run_shuffle_stages()?;
            partitions
                .par_iter()
                .map(|p| node.compute(p).map(|data| data.len()))
                .try_reduce(|| 0, |a, b| Ok(a + b))
        })
    }

}
