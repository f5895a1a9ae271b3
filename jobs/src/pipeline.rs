//! The end-to-end employee statistics job.
//!
//! Generate → {key-value path, dataframe path} → cross-check → Parquet sink.

use crate::config::JobConfig;
use crate::generator::EmployeeGenerator;
use crate::kv_stats::{GroupAverage, KeyValueStats};
use crate::table_stats::{TableStats, avg_salary_by_key, count_by_key};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use tally_common::{CommonError, ErrorContext, Result};
use tally_core::{DistributedDataset, ParquetSink, SaveMode, TallyContext, WriteSummary};
use tracing::{debug, info, warn};

pub const PROCESSED_DATA_FILE: &str = "processed_data.parquet";
pub const DEPARTMENT_STATS_FILE: &str = "department_stats.parquet";
pub const AGE_STATS_FILE: &str = "age_stats.parquet";

/// Largest allowed difference between the averages of the two paths.
pub const CROSS_CHECK_TOLERANCE: f64 = 1e-6;

const EMPLOYEES_TABLE: &str = "employees";
const SHOW_ROWS: usize = 20;
const SAMPLE_ROWS: usize = 5;

/// One written output file. The path is kept in display form so the report
/// encodes even when the output directory is not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputReport {
    pub path: String,
    pub rows: usize,
    pub bytes: u64,
    pub attempts: u32,
}

impl From<WriteSummary> for OutputReport {
    fn from(summary: WriteSummary) -> Self {
        Self {
            path: summary.path.display().to_string(),
            rows: summary.rows,
            bytes: summary.bytes,
            attempts: summary.attempts,
        }
    }
}

/// Summary of a finished run, logged as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub app_name: String,
    pub rows: usize,
    pub seed: Option<u64>,
    pub high_salary_count: usize,
    pub department_avg_salary: BTreeMap<String, f64>,
    pub age_group_stats: BTreeMap<String, GroupAverage>,
    pub outputs: Vec<OutputReport>,
}

/// Runs the job with its own context, stopping the context on every exit path.
pub async fn run(config: &JobConfig) -> Result<JobReport> {
    config.validate()?;
    let context = TallyContext::new(config.context_config())?;
    let result = run_with_context(&context, config).await;
    context.stop();
    result
}

/// Runs the job on an existing context.
pub async fn run_with_context(context: &TallyContext, config: &JobConfig) -> Result<JobReport> {
    config.validate()?;

    let records = EmployeeGenerator::new(config.seed).generate(config.rows)?;
    let employees = context.parallelize(records);
    let employees_df = {
        let employees = employees.clone();
        blocking_stage("dataframe conversion", move || {
            employees.to_dataframe(EMPLOYEES_TABLE)
        })
        .await?
    };
    info!("Created DataFrame with {} records", employees_df.count().await?);
    debug!(schema = ?employees_df.schema(), "employee schema");

    let kv = blocking_stage("key-value aggregation", move || {
        KeyValueStats::compute(&employees)
    })
    .await?;

    let tables = TableStats::build(&employees_df)?;
    let department_batches = tables.department_stats.collect().await?;
    let age_batches = tables.age_stats.collect().await?;
    info!(
        "Department statistics:\n{}",
        tables.department_stats.show(SHOW_ROWS).await?
    );
    info!("Age group statistics:\n{}", tables.age_stats.show(SHOW_ROWS).await?);

    cross_check(
        &kv,
        &avg_salary_by_key(&department_batches, "department")?,
        &avg_salary_by_key(&age_batches, "age_group")?,
        &count_by_key(&age_batches, "age_group", "count")?,
    )?;

    let outputs = save_results(config, &config.sink(), &tables).await?;
    info!("Sample of processed data:\n{}", tables.processed.show(SAMPLE_ROWS).await?);

    let report = JobReport {
        app_name: context.app_name().to_string(),
        rows: config.rows,
        seed: config.seed,
        high_salary_count: kv.high_salary_count,
        department_avg_salary: kv.department_avg_salary,
        age_group_stats: kv.age_group_stats,
        outputs,
    };
    match serde_json::to_string(&report) {
        Ok(json) => info!(report = %json, "Job completed successfully"),
        Err(e) => {
            warn!(error = %e, "failed to encode job report");
            info!(report = ?report, "Job completed successfully");
        }
    }
    Ok(report)
}

/// Runs a stage that blocks on the worker pool outside the async executor.
async fn blocking_stage<T, F>(stage: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        CommonError::internal_error_with_source(format!("{} task failed", stage), e)
    })?
}

async fn save_results(
    config: &JobConfig,
    sink: &ParquetSink,
    tables: &TableStats,
) -> Result<Vec<OutputReport>> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let targets: [(&str, &dyn DistributedDataset); 3] = [
        (PROCESSED_DATA_FILE, tables.processed.as_ref()),
        (DEPARTMENT_STATS_FILE, tables.department_stats.as_ref()),
        (AGE_STATS_FILE, tables.age_stats.as_ref()),
    ];

    let mut outputs = Vec::with_capacity(targets.len());
    for (file_name, dataset) in targets {
        let path = config.output_dir.join(file_name);
        let summary = dataset.write_parquet(&path, SaveMode::Overwrite, sink).await?;
        info!("Saved {} to: {}", file_name, summary.path.display());
        outputs.push(summary.into());
    }
    Ok(outputs)
}

/// Fails with an internal error unless both aggregation paths found the same
/// groups with averages within [`CROSS_CHECK_TOLERANCE`].
pub fn cross_check(
    kv: &KeyValueStats,
    department_avg_salary: &BTreeMap<String, f64>,
    age_avg_salary: &BTreeMap<String, f64>,
    age_counts: &BTreeMap<String, i64>,
) -> Result<()> {
    compare_averages("department", &kv.department_avg_salary, department_avg_salary)?;

    let kv_age_avg: BTreeMap<String, f64> = kv
        .age_group_stats
        .iter()
        .map(|(k, v)| (k.clone(), v.avg_salary))
        .collect();
    compare_averages("age group", &kv_age_avg, age_avg_salary)?;

    for (group, stats) in &kv.age_group_stats {
        let table_count = age_counts.get(group).copied().unwrap_or_default();
        if i64::try_from(stats.count).ok() != Some(table_count) {
            return Err(CommonError::internal_error(format!(
                "age group '{}' has {} rows in the key-value path but {} in the dataframe path",
                group, stats.count, table_count
            )));
        }
    }

    debug!("aggregation paths agree");
    Ok(())
}

fn compare_averages(
    what: &str,
    kv: &BTreeMap<String, f64>,
    table: &BTreeMap<String, f64>,
) -> Result<()> {
    if kv.keys().ne(table.keys()) {
        return Err(CommonError::internal_error(format!(
            "{} keys differ between paths: {:?} vs {:?}",
            what,
            kv.keys().collect::<Vec<_>>(),
            table.keys().collect::<Vec<_>>()
        )));
    }
    for (key, expected) in kv {
        let actual = table[key];
        if (expected - actual).abs() > CROSS_CHECK_TOLERANCE {
            return Err(CommonError::internal_error(format!(
                "{} '{}' average salary differs between paths: {} vs {}",
                what, key, expected, actual
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv() -> KeyValueStats {
        KeyValueStats {
            high_salary_count: 2,
            department_avg_salary: BTreeMap::from([("Eng".to_string(), 50_000.0)]),
            age_group_stats: BTreeMap::from([(
                "Young".to_string(),
                GroupAverage {
                    count: 2,
                    avg_salary: 60_000.0,
                },
            )]),
        }
    }

    #[test]
    fn test_cross_check_accepts_agreement() {
        let departments = BTreeMap::from([("Eng".to_string(), 50_000.0 + 1e-9)]);
        let ages = BTreeMap::from([("Young".to_string(), 60_000.0)]);
        let counts = BTreeMap::from([("Young".to_string(), 2)]);
        assert!(cross_check(&kv(), &departments, &ages, &counts).is_ok());
    }

    #[test]
    fn test_cross_check_rejects_drift() {
        let ages = BTreeMap::from([("Young".to_string(), 60_000.0)]);
        let counts = BTreeMap::from([("Young".to_string(), 2)]);

        let drifted = BTreeMap::from([("Eng".to_string(), 50_000.1)]);
        let err = cross_check(&kv(), &drifted, &ages, &counts).unwrap_err();
        assert!(matches!(err, CommonError::InternalError { .. }));

        let missing = BTreeMap::new();
        assert!(cross_check(&kv(), &missing, &ages, &counts).is_err());

        let departments = BTreeMap::from([("Eng".to_string(), 50_000.0)]);
        let wrong_counts = BTreeMap::from([("Young".to_string(), 3)]);
        assert!(cross_check(&kv(), &departments, &ages, &wrong_counts).is_err());
    }
}
