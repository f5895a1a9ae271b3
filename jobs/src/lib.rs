//! Tally Jobs - the employee statistics job
//!
//! Generates synthetic employee records, aggregates them once through the
//! key-value RDD path and once through the dataframe path, checks that both
//! agree, and writes the results as Parquet.

pub mod config;
pub mod employee;
pub mod generator;
pub mod kv_stats;
pub mod pipeline;
pub mod table_stats;

pub use config::JobConfig;
pub use employee::{AgeGroup, Employee, SalaryCategory};
pub use generator::EmployeeGenerator;
pub use kv_stats::{GroupAverage, KeyValueStats};
pub use pipeline::{JobReport, OutputReport, run, run_with_context};
pub use table_stats::TableStats;
