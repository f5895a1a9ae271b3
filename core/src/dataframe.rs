//! Provides a dataframe abstraction, `DistributedDataset`, on top of DataFusion.
//!
//! A dataset is a DataFusion `LogicalPlan` plus the context it runs in.
//! Transformations extend the plan; actions execute it on the context's
//! `SessionContext`.

use crate::context::ContextHandle;
use crate::columnar::ToRecordBatch;
use crate::rdd::Rdd;
use crate::sink::{ParquetSink, SaveMode, WriteSummary};
use crate::traits::Data;
use arrow::array::Int64Array;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use async_trait::async_trait;
use datafusion::datasource::{MemTable, provider_as_source};
use datafusion::functions_aggregate::expr_fn::count;
use datafusion::logical_expr::{Expr, LogicalPlan, LogicalPlanBuilder, SortExpr, col, lit};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tally_common::{CommonError, Result};
use tracing::debug;

/// The `DistributedDataset` trait provides a dataframe abstraction over a
/// partitioned collection of rows. It encapsulates the data's lineage through
/// a DataFusion `LogicalPlan`.
#[async_trait]
pub trait DistributedDataset: Send + Sync {
    /// Returns the context associated with this dataset.
    fn context(&self) -> ContextHandle;

    /// Returns the logical plan that represents the computation to produce this dataset.
    fn logical_plan(&self) -> Arc<LogicalPlan>;

    /// The Arrow schema of the rows this dataset produces.
    fn schema(&self) -> SchemaRef {
        self.logical_plan().schema().inner().clone()
    }

    // --- Transformations ---

    /// Returns a new dataset by selecting a set of columns (projection).
    fn select(&self, cols: &[&str]) -> Result<Arc<dyn DistributedDataset>>;

    /// Returns a new dataset containing only the rows that satisfy a predicate.
    fn filter(&self, predicate: Expr) -> Result<Arc<dyn DistributedDataset>>;

    /// Adds a computed column, replacing any existing column of the same name.
    fn with_column(&self, name: &str, expr: Expr) -> Result<Arc<dyn DistributedDataset>>;

    /// Groups by `group_by` and evaluates `aggregates` per group.
    fn aggregate(
        &self,
        group_by: Vec<Expr>,
        aggregates: Vec<Expr>,
    ) -> Result<Arc<dyn DistributedDataset>>;

    /// Returns a new dataset ordered by `order_by`.
    fn sort(&self, order_by: Vec<SortExpr>) -> Result<Arc<dyn DistributedDataset>>;

    /// Returns a new dataset with at most `n` rows.
    fn limit(&self, n: usize) -> Result<Arc<dyn DistributedDataset>>;

    // --- Actions ---

    /// Returns all rows of the dataset as a collection of `RecordBatch`es to the driver.
    async fn collect(&self) -> Result<Vec<RecordBatch>>;

    /// Returns the number of rows in the dataset.
    async fn count(&self) -> Result<u64>;

    /// Renders the first `n` rows as a text table.
    async fn show(&self, n: usize) -> Result<String>;

    /// Executes the plan and writes the result to one Parquet file at `path`.
    async fn write_parquet(
        &self,
        path: &Path,
        mode: SaveMode,
        sink: &ParquetSink,
    ) -> Result<WriteSummary>;
}

/// The default implementation of a `DistributedDataset`.
#[derive(Clone)]
pub struct DataFrame {
    /// The context for the Tally application, providing access to shared resources.
    context: ContextHandle,
    /// The logical plan representing the dataset's lineage and transformations.
    plan: Arc<LogicalPlan>,
}

impl std::fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFrame")
            .field("context", &self.context)
            .field("schema", &self.schema())
            .finish()
    }
}

impl DataFrame {
    /// Creates a new `DataFrame` from a context and a logical plan.
    pub fn new(context: ContextHandle, plan: Arc<LogicalPlan>) -> Self {
        Self { context, plan }
    }

    /// Creates a dataset scanning in-memory batches, one inner `Vec` per partition.
    pub fn from_partitions(
        context: ContextHandle,
        table_name: &str,
        schema: SchemaRef,
        partitions: Vec<Vec<RecordBatch>>,
    ) -> Result<Self> {
        context.ensure_active()?;
        let table_provider = MemTable::try_new(schema, partitions)?;
        let table_source = provider_as_source(Arc::new(table_provider));
        let plan = LogicalPlanBuilder::scan(table_name, table_source, None)?.build()?;
        Ok(Self::new(context, Arc::new(plan)))
    }

    fn derive(&self, builder: LogicalPlanBuilder) -> Result<Arc<dyn DistributedDataset>> {
        let plan = builder.build()?;
        Ok(Arc::new(DataFrame::new(self.context.clone(), Arc::new(plan))))
    }

    fn builder(&self) -> LogicalPlanBuilder {
        LogicalPlanBuilder::from(self.plan.as_ref().clone())
    }
}

#[async_trait]
impl DistributedDataset for DataFrame {
    fn context(&self) -> ContextHandle {
        self.context.clone()
    }

    fn logical_plan(&self) -> Arc<LogicalPlan> {
        self.plan.clone()
    }

    fn select(&self, cols: &[&str]) -> Result<Arc<dyn DistributedDataset>> {
        let projections: Vec<Expr> = cols.iter().map(|c| col(*c)).collect();
        self.derive(self.builder().project(projections)?)
    }

    fn filter(&self, predicate: Expr) -> Result<Arc<dyn DistributedDataset>> {
        self.derive(self.builder().filter(predicate)?)
    }

    fn with_column(&self, name: &str, expr: Expr) -> Result<Arc<dyn DistributedDataset>> {
        let mut projections: Vec<Expr> = self
            .plan
            .schema()
            .columns()
            .into_iter()
            .filter(|c| c.name != name)
            .map(Expr::Column)
            .collect();
        projections.push(expr.alias(name));
        self.derive(self.builder().project(projections)?)
    }

    fn aggregate(
        &self,
        group_by: Vec<Expr>,
        aggregates: Vec<Expr>,
    ) -> Result<Arc<dyn DistributedDataset>> {
        self.derive(self.builder().aggregate(group_by, aggregates)?)
    }

    fn sort(&self, order_by: Vec<SortExpr>) -> Result<Arc<dyn DistributedDataset>> {
        self.derive(self.builder().sort(order_by)?)
    }

    fn limit(&self, n: usize) -> Result<Arc<dyn DistributedDataset>> {
        self.derive(self.builder().limit(0, Some(n))?)
    }

    async fn collect(&self) -> Result<Vec<RecordBatch>> {
        self.context.ensure_active()?;
        debug!(plan = %self.plan.display_indent(), "executing plan");
        let df = self
            .context
            .df_session_ctx()
            .execute_logical_plan(self.plan.as_ref().clone())
            .await?;
        let results = df.collect().await?;
        Ok(results)
    }

    async fn count(&self) -> Result<u64> {
        // Create an aggregate plan to count all rows
        let count_plan = self
            .builder()
            .aggregate(Vec::<Expr>::new(), vec![count(lit(1)).alias("count")])?
            .build()?;
        let results = DataFrame::new(self.context.clone(), Arc::new(count_plan))
            .collect()
            .await?;

        let Some(batch) = results.iter().find(|b| b.num_rows() > 0) else {
            return Ok(0);
        };

        let count_array = batch
            .column_by_name("count")
            .ok_or_else(|| CommonError::internal_error("Count column not found"))?
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| CommonError::internal_error("Count column is not Int64"))?;

        u64::try_from(count_array.value(0))
            .map_err(|e| CommonError::internal_error_with_source("negative row count", e))
    }

    async fn show(&self, n: usize) -> Result<String> {
        let batches = self.limit(n)?.collect().await?;
        Ok(pretty_format_batches(&batches)?.to_string())
    }

    async fn write_parquet(
        &self,
        path: &Path,
        mode: SaveMode,
        sink: &ParquetSink,
    ) -> Result<WriteSummary> {
        let batches = self.collect().await?;
        // Executed batches carry the physical schema, which may differ from the
        // logical one in nullability only.
        let schema = batches
            .first()
            .map(|b| b.schema())
            .unwrap_or_else(|| self.schema());

        let sink = sink.clone();
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || sink.write(&path, schema, &batches, mode))
            .await
            .map_err(|e| CommonError::internal_error_with_source("parquet writer task failed", e))?
    }
}

impl<T: Data + ToRecordBatch> Rdd<T> {
    /// Materializes this RDD into an in-memory dataset registered under
    /// `table_name`, keeping one dataset partition per RDD partition.
    pub fn to_dataframe(&self, table_name: &str) -> Result<DataFrame> {
        let partitions = self
            .collect_partitions()?
            .iter()
            .map(|rows| T::to_record_batch(rows).map(|batch| vec![batch]))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            rdd_id = self.id(),
            table_name,
            num_partitions = partitions.len(),
            "converted rdd to dataframe"
        );
        DataFrame::from_partitions(self.context.clone(), table_name, T::schema(), partitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextConfig, TallyContext};
    use arrow::array::{Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    fn dataset(context: &TallyContext) -> DataFrame {
        let schema = Arc::new(Schema::new(vec![
            Field::new("department", DataType::Utf8, false),
            Field::new("salary", DataType::Int64, false),
        ]));
        let first = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["Eng", "Eng"])),
                Arc::new(Int64Array::from(vec![40_000, 60_000])),
            ],
        )
        .unwrap();
        let second = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["Sales"])),
                Arc::new(Int64Array::from(vec![80_000])),
            ],
        )
        .unwrap();
        DataFrame::from_partitions(context.handle(), "staff", schema, vec![vec![first], vec![second]])
            .unwrap()
    }

    fn context() -> TallyContext {
        TallyContext::new(ContextConfig::new("df-test").with_parallelism(2)).unwrap()
    }

    #[tokio::test]
    async fn test_count_and_filter() {
        let context = context();
        let df = dataset(&context);
        assert_eq!(df.count().await.unwrap(), 3);

        let high = df.filter(col("salary").gt(lit(50_000))).unwrap();
        assert_eq!(high.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_with_column_replaces_existing() {
        let context = context();
        let df = dataset(&context);
        let doubled = df.with_column("salary", col("salary") * lit(2)).unwrap();
        let names: Vec<String> = doubled
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["department", "salary"]);

        let bonus = df.with_column("bonus", col("salary") / lit(10)).unwrap();
        assert_eq!(bonus.schema().fields().len(), 3);
    }

    #[tokio::test]
    async fn test_select_sort_limit() {
        let context = context();
        let df = dataset(&context);
        let top = df
            .sort(vec![col("salary").sort(false, false)])
            .unwrap()
            .limit(1)
            .unwrap()
            .select(&["department"])
            .unwrap();

        let batches = top.collect().await.unwrap();
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 1);
        let batch = batches.iter().find(|b| b.num_rows() > 0).unwrap();
        let departments = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(departments.value(0), "Sales");
        assert_eq!(departments.null_count(), 0);
    }

    #[tokio::test]
    async fn test_show_renders_table() {
        let context = context();
        let rendered = dataset(&context).show(5).await.unwrap();
        assert!(rendered.contains("department"));
        assert!(rendered.contains("Sales"));
    }

    #[tokio::test]
    async fn test_actions_fail_after_stop() {
        let context = context();
        let df = dataset(&context);
        context.stop();

        let err = df.collect().await.unwrap_err();
        assert!(err.to_string().contains("has been stopped"));
        assert!(
            DataFrame::from_partitions(context.handle(), "t", df.schema(), vec![]).is_err()
        );
    }
}
