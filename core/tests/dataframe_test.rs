//! Dataframes built from RDDs: grouping, sorting and writing

mod common;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema, SchemaRef};
use common::create_test_context;
use datafusion::functions_aggregate::expr_fn::{avg, count};
use datafusion::logical_expr::{col, lit};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_core::{DistributedDataset, ParquetSink, SaveMode, ToArrowArray, ToRecordBatch};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sale {
    region: String,
    amount: i64,
}

impl ToRecordBatch for Sale {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("region", String::data_type(), false),
            Field::new("amount", i64::data_type(), false),
        ]))
    }

    fn columns(rows: &[Self]) -> Vec<ArrayRef> {
        vec![
            String::to_array(rows, |r| r.region.clone()),
            i64::to_array(rows, |r| r.amount),
        ]
    }
}

fn sales() -> Vec<Sale> {
    [("north", 10), ("south", 20), ("north", 30), ("east", 5), ("south", 40)]
        .into_iter()
        .map(|(region, amount)| Sale {
            region: region.to_string(),
            amount,
        })
        .collect()
}

#[tokio::test]
async fn test_group_by_average_from_rdd() {
    let context = create_test_context("df-groupby");
    let df = context
        .parallelize_with_partitions(sales(), 3)
        .to_dataframe("sales")
        .unwrap();
    assert_eq!(df.count().await.unwrap(), 5);

    let stats = df
        .aggregate(
            vec![col("region")],
            vec![
                count(lit(1)).alias("n"),
                avg(col("amount")).alias("avg_amount"),
            ],
        )
        .unwrap()
        .sort(vec![col("region").sort(true, false)])
        .unwrap();

    let batches = stats.collect().await.unwrap();
    let mut rows = Vec::new();
    for batch in &batches {
        let regions = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        let counts = batch.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
        let avgs = batch.column(2).as_any().downcast_ref::<Float64Array>().unwrap();
        for i in 0..batch.num_rows() {
            rows.push((regions.value(i).to_string(), counts.value(i), avgs.value(i)));
        }
    }

    assert_eq!(
        rows,
        vec![
            ("east".to_string(), 1, 5.0),
            ("north".to_string(), 2, 20.0),
            ("south".to_string(), 2, 30.0),
        ]
    );
}

#[tokio::test]
async fn test_write_parquet_round_trip_row_count() {
    let context = create_test_context("df-write");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("sales.parquet");

    let df = context.parallelize(sales()).to_dataframe("sales").unwrap();
    let filtered = df.filter(col("amount").gt_eq(lit(20))).unwrap();
    let summary = filtered
        .write_parquet(&path, SaveMode::Overwrite, &ParquetSink::new())
        .await
        .unwrap();
    assert_eq!(summary.rows, 3);

    let reader = ParquetRecordBatchReaderBuilder::try_new(std::fs::File::open(&path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let read: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(read, 3);
}

#[tokio::test]
async fn test_empty_rdd_gives_empty_dataframe() {
    let context = create_test_context("df-empty");
    let df = context.parallelize(Vec::<Sale>::new()).to_dataframe("sales").unwrap();
    assert_eq!(df.count().await.unwrap(), 0);
    assert_eq!(df.schema().fields().len(), 2);
}
