//! Command-line entry point for the employee statistics job.
//!
//! ```bash
//! employee-stats --rows 1000 --output-dir data/output --seed 42 -v
//! ```

use clap::Parser;
use tally_common::Diagnose;
use tally_jobs::{JobConfig, pipeline};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = JobConfig::parse();

    // RUST_LOG, when set, takes precedence over -v.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.verbose >= 2)
        .with_thread_names(config.verbose >= 2)
        .init();

    info!("Starting {}...", config.app_name);
    debug!(?config, "job configuration");

    match pipeline::run(&config).await {
        Ok(report) => {
            info!(
                outputs = report.outputs.len(),
                output_dir = %config.output_dir.display(),
                "Job finished"
            );
        }
        Err(e) => {
            error!("Error in {}: {}", config.app_name, e);
            for line in e.context() {
                debug!("  {}", line);
            }
            for suggestion in e.suggestions() {
                error!("  suggestion: {}", suggestion);
            }
            std::process::exit(1);
        }
    }
}
