//! Tally Core - a single-process Spark-style engine in Rust
//!
//! This is the core module of the Tally project. It provides a context owning
//! the execution resources, partitioned collections with key-value reduction,
//! DataFusion-backed dataframes, and an atomic Parquet sink.

pub mod columnar;
pub mod context;
pub mod dataframe;
pub mod rdd;
pub mod retry;
pub mod shuffle;
pub mod sink;
pub mod traits;

pub use columnar::{ToArrowArray, ToRecordBatch};
pub use context::{ContextConfig, ContextHandle, TallyContext};
pub use dataframe::{DataFrame, DistributedDataset};
pub use rdd::{PairRdd, Rdd};
pub use retry::RetryPolicy;
pub use sink::{ParquetCompression, ParquetSink, SaveMode, WriteSummary};
pub use traits::{Data, RddError, RddResult};
