//! Declarative group-by aggregation over the employee dataframe.

use crate::employee::{
    AgeGroup, LOW_SALARY_LIMIT, MEDIUM_SALARY_LIMIT, MIDDLE_AGE_LIMIT, SalaryCategory,
    YOUNG_AGE_LIMIT,
};
use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion::functions_aggregate::expr_fn::{avg, count};
use datafusion::logical_expr::{Expr, col, lit, when};
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_common::{CommonError, Result};
use tally_core::DistributedDataset;
use tracing::info;

/// `CASE` expression labelling `age` with its [`AgeGroup`].
pub fn age_group_expr() -> Result<Expr> {
    Ok(
        when(col("age").lt(lit(YOUNG_AGE_LIMIT)), lit(AgeGroup::Young.as_str()))
            .when(col("age").lt(lit(MIDDLE_AGE_LIMIT)), lit(AgeGroup::Middle.as_str()))
            .otherwise(lit(AgeGroup::Senior.as_str()))?,
    )
}

/// `CASE` expression labelling `salary` with its [`SalaryCategory`].
pub fn salary_category_expr() -> Result<Expr> {
    Ok(
        when(col("salary").lt(lit(LOW_SALARY_LIMIT)), lit(SalaryCategory::Low.as_str()))
            .when(
                col("salary").lt(lit(MEDIUM_SALARY_LIMIT)),
                lit(SalaryCategory::Medium.as_str()),
            )
            .otherwise(lit(SalaryCategory::High.as_str()))?,
    )
}

/// Adds the `age_group` and `salary_category` columns.
pub fn with_features(df: &dyn DistributedDataset) -> Result<Arc<dyn DistributedDataset>> {
    df.with_column("age_group", age_group_expr()?)?
        .with_column("salary_category", salary_category_expr()?)
}

/// Head count, mean salary and mean age per department, sorted by department.
pub fn department_stats(features: &dyn DistributedDataset) -> Result<Arc<dyn DistributedDataset>> {
    features
        .aggregate(
            vec![col("department")],
            vec![
                count(lit(1)).alias("employee_count"),
                avg(col("salary")).alias("avg_salary"),
                avg(col("age")).alias("avg_age"),
            ],
        )?
        .sort(vec![col("department").sort(true, false)])
}

/// Head count and mean salary per age group, sorted by age group.
pub fn age_stats(features: &dyn DistributedDataset) -> Result<Arc<dyn DistributedDataset>> {
    features
        .aggregate(
            vec![col("age_group")],
            vec![
                count(lit(1)).alias("count"),
                avg(col("salary")).alias("avg_salary"),
            ],
        )?
        .sort(vec![col("age_group").sort(true, false)])
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| CommonError::internal_error(format!("column '{}' not found", name)))?;
    let utf8 = cast(column, &DataType::Utf8)?;
    utf8.as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| CommonError::internal_error(format!("column '{}' is not Utf8", name)))
}

fn typed_column<'a, A: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a A> {
    batch
        .column_by_name(name)
        .ok_or_else(|| CommonError::internal_error(format!("column '{}' not found", name)))?
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| {
            CommonError::internal_error(format!("column '{}' has an unexpected type", name))
        })
}

/// Reads `key -> avg_salary` out of a collected stats table.
pub fn avg_salary_by_key(batches: &[RecordBatch], key: &str) -> Result<BTreeMap<String, f64>> {
    let mut averages = BTreeMap::new();
    for batch in batches {
        let keys = string_column(batch, key)?;
        let values = typed_column::<Float64Array>(batch, "avg_salary")?;
        for i in 0..batch.num_rows() {
            averages.insert(keys.value(i).to_string(), values.value(i));
        }
    }
    Ok(averages)
}

/// Reads `key -> count_column` out of a collected stats table.
pub fn count_by_key(
    batches: &[RecordBatch],
    key: &str,
    count_column: &str,
) -> Result<BTreeMap<String, i64>> {
    let mut counts = BTreeMap::new();
    for batch in batches {
        let keys = string_column(batch, key)?;
        let values = typed_column::<Int64Array>(batch, count_column)?;
        for i in 0..batch.num_rows() {
            counts.insert(keys.value(i).to_string(), values.value(i));
        }
    }
    Ok(counts)
}

/// The three tables of the dataframe path, not yet executed.
pub struct TableStats {
    pub processed: Arc<dyn DistributedDataset>,
    pub department_stats: Arc<dyn DistributedDataset>,
    pub age_stats: Arc<dyn DistributedDataset>,
}

impl TableStats {
    pub fn build(employees: &dyn DistributedDataset) -> Result<Self> {
        info!("Applying DataFrame transformations...");
        let processed = with_features(employees)?;
        let department_stats = department_stats(processed.as_ref())?;
        let age_stats = age_stats(processed.as_ref())?;
        Ok(Self {
            processed,
            department_stats,
            age_stats,
        })
    }
}
