//! Job configuration, parsed from the command line or built in code.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tally_common::{CommonError, Result};
use tally_core::{ContextConfig, ParquetCompression, ParquetSink, RetryPolicy};

pub const DEFAULT_ROWS: usize = 1000;
pub const DEFAULT_OUTPUT_DIR: &str = "data/output";
pub const DEFAULT_APP_NAME: &str = "EmployeeStatsJob";
pub const DEFAULT_WRITE_RETRIES: u32 = 3;

/// Generate synthetic employees, aggregate them two ways and write Parquet results
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "employee-stats")]
#[command(about = "Employee statistics over synthetic records", long_about = None)]
#[command(version)]
pub struct JobConfig {
    /// Number of employee records to generate
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    pub rows: usize,

    /// Directory the three Parquet results are written to
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Seed for the record generator (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads and partitions (default: number of CPUs)
    #[arg(long, default_value_t = num_cpus::get())]
    pub parallelism: usize,

    /// Parquet compression codec: uncompressed, snappy or zstd
    #[arg(long, default_value_t = ParquetCompression::Snappy)]
    pub compression: ParquetCompression,

    /// Attempts per output file, including the first one
    #[arg(long, default_value_t = DEFAULT_WRITE_RETRIES)]
    pub write_retries: u32,

    /// Application name used for the context and worker threads
    #[arg(long, default_value = DEFAULT_APP_NAME)]
    pub app_name: String,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            seed: None,
            parallelism: num_cpus::get(),
            compression: ParquetCompression::default(),
            write_retries: DEFAULT_WRITE_RETRIES,
            app_name: DEFAULT_APP_NAME.to_string(),
            verbose: 0,
        }
    }
}

impl JobConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return Err(CommonError::configuration_error("--rows must be at least 1"));
        }
        if self.parallelism == 0 {
            return Err(CommonError::configuration_error(
                "--parallelism must be at least 1",
            ));
        }
        if self.write_retries == 0 {
            return Err(CommonError::configuration_error(
                "--write-retries must be at least 1",
            ));
        }
        if self.app_name.trim().is_empty() {
            return Err(CommonError::configuration_error(
                "--app-name must not be empty",
            ));
        }
        Ok(())
    }

    pub fn context_config(&self) -> ContextConfig {
        ContextConfig::new(self.app_name.clone()).with_parallelism(self.parallelism)
    }

    pub fn sink(&self) -> ParquetSink {
        ParquetSink::new()
            .with_compression(self.compression)
            .with_retry(RetryPolicy::new(self.write_retries).with_max_delay(Duration::from_secs(2)))
    }

    /// `tracing` filter directive for the configured verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
