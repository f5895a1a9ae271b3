//! Save modes and failure behaviour of the Parquet sink

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tally_common::{CommonError, Diagnose};
use tally_core::{ParquetCompression, ParquetSink, RetryPolicy, SaveMode};

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("age_group", DataType::Utf8, false),
        Field::new("count", DataType::Int64, false),
    ]))
}

fn batch(groups: &[&str], counts: &[i64]) -> RecordBatch {
    RecordBatch::try_new(
        schema(),
        vec![
            Arc::new(StringArray::from(groups.to_vec())),
            Arc::new(Int64Array::from(counts.to_vec())),
        ],
    )
    .unwrap()
}

fn staging_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".tally-"))
        .collect()
}

#[test]
fn test_overwrite_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("age_stats.parquet");
    let sink = ParquetSink::new();
    let batches = [batch(&["Middle", "Senior", "Young"], &[4, 2, 3])];

    let first = sink.write(&path, schema(), &batches, SaveMode::Overwrite).unwrap();
    let first_bytes = fs::read(&path).unwrap();
    let second = sink.write(&path, schema(), &batches, SaveMode::Overwrite).unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(fs::read(&path).unwrap(), first_bytes);
    assert!(staging_files(dir.path()).is_empty());
}

#[test]
fn test_error_if_exists_refuses_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.parquet");
    let sink = ParquetSink::new();

    sink.write(&path, schema(), &[batch(&["Young"], &[1])], SaveMode::ErrorIfExists)
        .unwrap();
    let err = sink
        .write(&path, schema(), &[batch(&["Old"], &[9])], SaveMode::ErrorIfExists)
        .unwrap_err();

    assert!(matches!(err, CommonError::ConfigurationError { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn test_ignore_keeps_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.parquet");
    let sink = ParquetSink::new();

    sink.write(&path, schema(), &[batch(&["Young"], &[1])], SaveMode::Overwrite)
        .unwrap();
    let before = fs::read(&path).unwrap();

    let summary = sink
        .write(&path, schema(), &[batch(&["A", "B"], &[1, 2])], SaveMode::Ignore)
        .unwrap();
    assert!(summary.skipped());
    assert_eq!(summary.rows, 0);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_failed_write_keeps_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.parquet");
    let sink = ParquetSink::new();

    sink.write(&path, schema(), &[batch(&["Young"], &[1])], SaveMode::Overwrite)
        .unwrap();
    let before = fs::read(&path).unwrap();

    let wrong = Arc::new(Schema::new(vec![Field::new("other", DataType::Int64, false)]));
    assert!(
        sink.write(&path, wrong, &[batch(&["Young"], &[2])], SaveMode::Overwrite)
            .is_err()
    );
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(staging_files(dir.path()).is_empty());
}

#[test]
fn test_failed_rename_removes_staged_file() {
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory in place of the target makes the final rename fail
    // after the data has been staged.
    let path = dir.path().join("stats.parquet");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("keep"), b"x").unwrap();

    let sink = ParquetSink::new().with_retry(RetryPolicy::no_retry());
    let result = sink.write(&path, schema(), &[batch(&["Young"], &[1])], SaveMode::Overwrite);

    assert!(result.is_err());
    assert!(path.join("keep").exists());
    assert!(staging_files(dir.path()).is_empty());
}

#[test]
fn test_compression_codecs_write_readable_files() {
    let dir = tempfile::tempdir().unwrap();
    for compression in [
        ParquetCompression::Uncompressed,
        ParquetCompression::Snappy,
        ParquetCompression::Zstd,
    ] {
        let path = dir.path().join(format!("{}.parquet", compression));
        let summary = ParquetSink::new()
            .with_compression(compression)
            .write(&path, schema(), &[batch(&["Young", "Senior"], &[3, 4])], SaveMode::Overwrite)
            .unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.attempts, 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), summary.bytes);
    }
}
