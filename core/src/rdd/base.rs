//! Base RDD implementations
//!
//! [`Rdd`] is the user-facing handle: a lineage node plus the context it runs
//! in. Narrow transformations (`map`, `filter`) only extend the lineage; work
//! happens when an action in [`super::actions`] computes the partitions.

use crate::context::ContextHandle;
use crate::traits::{Data, Partition, RddBase, RddError, RddResult};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A Resilient Distributed Dataset over elements of type `T`.
pub struct Rdd<T: Data> {
    pub(crate) context: ContextHandle,
    pub(crate) node: Arc<dyn RddBase<T>>,
}

impl<T: Data> Clone for Rdd<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Data> Debug for Rdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rdd")
            .field("id", &self.id())
            .field("num_partitions", &self.num_partitions())
            .field("lineage", &self.node.lineage())
            .finish()
    }
}

impl<T: Data> Rdd<T> {
    pub(crate) fn from_node(context: ContextHandle, node: Arc<dyn RddBase<T>>) -> Self {
        Self { context, node }
    }

    pub fn id(&self) -> usize {
        self.node.id()
    }

    pub fn num_partitions(&self) -> usize {
        self.node.num_partitions()
    }

    /// The context this RDD runs in.
    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    /// Lineage description, e.g. `filter[3] <- parallelize[1]`.
    pub fn lineage(&self) -> String {
        self.node.lineage()
    }

    /// Apply a map transformation to this RDD
    pub fn map<U, F>(&self, func: F) -> Rdd<U>
    where
        U: Data,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let node = MappedRdd {
            id: self.context.new_rdd_id(),
            parent: Arc::clone(&self.node),
            func: Arc::new(func),
        };
        Rdd::from_node(self.context.clone(), Arc::new(node))
    }

    /// Apply a filter transformation to this RDD
    pub fn filter<F>(&self, predicate: F) -> Rdd<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let node = FilteredRdd {
            id: self.context.new_rdd_id(),
            parent: Arc::clone(&self.node),
            predicate: Arc::new(predicate),
        };
        Rdd::from_node(self.context.clone(), Arc::new(node))
    }
}

/// RDD backed by a vector of data split into contiguous slices
pub struct ParallelCollection<T: Data> {
    id: usize,
    data: Arc<Vec<T>>,
    num_partitions: usize,
}

impl<T: Data> ParallelCollection<T> {
    pub fn new(id: usize, data: Vec<T>, num_partitions: usize) -> Self {
        Self {
            id,
            data: Arc::new(data),
            num_partitions: num_partitions.max(1),
        }
    }
}

impl<T: Data> RddBase<T> for ParallelCollection<T> {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> &'static str {
        "parallelize"
    }

    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn compute(&self, partition: &dyn Partition) -> RddResult<Vec<T>> {
        let partition_index = partition.index();
        if partition_index >= self.num_partitions {
            return Err(RddError::InvalidPartition(partition_index));
        }

        let data_len = self.data.len();
        let partition_size = data_len.div_ceil(self.num_partitions);
        let start = partition_index * partition_size;
        let end = std::cmp::min(start + partition_size, data_len);

        if start >= data_len {
            Ok(Vec::new())
        } else {
            Ok(self.data[start..end].to_vec())
        }
    }
}

type MapFn<T, U> = Arc<dyn Fn(T) -> U + Send + Sync>;
type FilterFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// RDD that applies a map transformation
pub struct MappedRdd<T: Data, U: Data> {
    id: usize,
    parent: Arc<dyn RddBase<T>>,
    func: MapFn<T, U>,
}

impl<T: Data, U: Data> RddBase<U> for MappedRdd<T, U> {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> &'static str {
        "map"
    }

    fn num_partitions(&self) -> usize {
        self.parent.num_partitions()
    }

    fn compute(&self, partition: &dyn Partition) -> RddResult<Vec<U>> {
        let parent_data = self.parent.compute(partition)?;
        Ok(parent_data.into_iter().map(|item| (self.func)(item)).collect())
    }

    fn run_shuffle_stages(&self) -> RddResult<()> {
        self.parent.run_shuffle_stages()
    }

    fn lineage(&self) -> String {
        format!("{}[{}] <- {}", self.name(), self.id, self.parent.lineage())
    }
}

/// RDD that applies a filter transformation
pub struct FilteredRdd<T: Data> {
    id: usize,
    parent: Arc<dyn RddBase<T>>,
    predicate: FilterFn<T>,
}

impl<T: Data> RddBase<T> for FilteredRdd<T> {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> &'static str {
        "filter"
    }

    fn num_partitions(&self) -> usize {
        self.parent.num_partitions()
    }

    fn compute(&self, partition: &dyn Partition) -> RddResult<Vec<T>> {
        let parent_data = self.parent.compute(partition)?;
        Ok(parent_data
            .into_iter()
            .filter(|item| (self.predicate)(item))
            .collect())
    }

    fn run_shuffle_stages(&self) -> RddResult<()> {
        self.parent.run_shuffle_stages()
    }

    fn lineage(&self) -> String {
        format!("{}[{}] <- {}", self.name(), self.id, self.parent.lineage())
    }
}
