//! Core traits for the Tally execution engine
//!
//! This module defines the fundamental abstractions for RDDs (Resilient Distributed Datasets):
//! partitions, the lineage node trait, and the error type their computations return.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tally_common::CommonError;
use thiserror::Error;

/// Error types for RDD operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RddError {
    #[error("Computation failed: {0}")]
    ComputationError(String),

    #[error("Invalid partition: {0}")]
    InvalidPartition(usize),

    #[error("Context '{0}' has been stopped")]
    ContextStopped(String),

    #[error("Shuffle error: {0}")]
    ShuffleError(String),
}

/// Result type for RDD operations
pub type RddResult<T> = Result<T, RddError>;

impl From<RddError> for CommonError {
    fn from(error: RddError) -> Self {
        match &error {
            RddError::ContextStopped(_) => {
                CommonError::configuration_error_with_source(error.to_string(), error)
            }
            _ => CommonError::execution_error_with_source(error.to_string(), error),
        }
    }
}

/// Partition represents a logical partition of data in an RDD
pub trait Partition: Send + Sync + Debug {
    /// Get the partition index
    fn index(&self) -> usize;

    /// Get a unique identifier for this partition
    fn id(&self) -> String {
        format!("partition_{}", self.index())
    }
}

/// Basic partition implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicPartition {
    index: usize,
}

impl BasicPartition {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Partition for BasicPartition {
    fn index(&self) -> usize {
        self.index
    }
}

/// A data type that can be used in an RDD.
pub trait Data:
    Send + Sync + Clone + Debug + Serialize + for<'de> Deserialize<'de> + 'static
{
}
impl<T> Data for T where
    T: Send + Sync + Clone + Debug + Serialize + for<'de> Deserialize<'de> + 'static
{
}

/// A node in an RDD lineage graph.
///
/// Nodes are immutable; computing a partition never mutates the node, so the
/// same node may be computed concurrently from several worker threads.
pub trait RddBase<T: Data>: Send + Sync {
    /// Get a unique ID for this RDD.
    fn id(&self) -> usize;

    /// Short operator name used in lineage descriptions.
    fn name(&self) -> &'static str;

    /// Get the number of partitions
    fn num_partitions(&self) -> usize;

    /// Compute the elements of this RDD for the given partition
    fn compute(&self, partition: &dyn Partition) -> RddResult<Vec<T>>;

    /// Get the list of partitions for this RDD
    fn partitions(&self) -> Vec<BasicPartition> {
        (0..self.num_partitions()).map(BasicPartition::new).collect()
    }

    /// Runs the map side of every shuffle this node depends on, so that
    /// computing partitions afterwards only reads shuffle output. Must be
    /// called from inside the context's worker pool.
    fn run_shuffle_stages(&self) -> RddResult<()> {
        Ok(())
    }

    /// Human readable lineage, innermost source last.
    fn lineage(&self) -> String {
        format!("{}[{}]", self.name(), self.id())
    }
}
