//! Parquet file sink with all-or-nothing writes.
//!
//! Batches are staged in a hidden temporary file next to the target, flushed
//! to disk, then renamed over the target. A failed attempt drops the staged
//! file, so readers only ever see the previous file or the complete new one.

use crate::retry::RetryPolicy;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tally_common::{CommonError, ErrorContext, Result};
use tracing::{debug, info};

const STAGING_PREFIX: &str = ".tally-";
const STAGING_SUFFIX: &str = ".parquet.tmp";

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Fail with a configuration error.
    ErrorIfExists,
    /// Keep the existing file and skip the write.
    Ignore,
}

/// Column compression codec for written files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Zstd,
}

impl ParquetCompression {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParquetCompression::Uncompressed => "uncompressed",
            ParquetCompression::Snappy => "snappy",
            ParquetCompression::Zstd => "zstd",
        }
    }

    fn codec(&self) -> Compression {
        match self {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

impl fmt::Display for ParquetCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParquetCompression {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uncompressed" | "none" => Ok(ParquetCompression::Uncompressed),
            "snappy" => Ok(ParquetCompression::Snappy),
            "zstd" => Ok(ParquetCompression::Zstd),
            other => Err(CommonError::configuration_error(format!(
                "unknown parquet compression '{}', expected one of uncompressed, snappy, zstd",
                other
            ))),
        }
    }
}

/// Outcome of one [`ParquetSink::write`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    /// Rows written. Zero when an existing file was kept under [`SaveMode::Ignore`].
    pub rows: usize,
    /// Size of the file at `path` after the call.
    pub bytes: u64,
    /// Attempts used; zero when the write was skipped.
    pub attempts: u32,
}

impl WriteSummary {
    pub fn skipped(&self) -> bool {
        self.attempts == 0
    }
}

/// Writes record batches to single Parquet files.
#[derive(Debug, Clone, Default)]
pub struct ParquetSink {
    compression: ParquetCompression,
    retry: RetryPolicy,
}

impl ParquetSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn compression(&self) -> ParquetCompression {
        self.compression
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Writes `batches` to `path` as one Parquet file with `schema`.
    ///
    /// Every batch must carry `schema`'s column names and types. The parent
    /// directory is created when missing. This call blocks; async callers run
    /// it on a blocking thread.
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        schema: SchemaRef,
        batches: &[RecordBatch],
        mode: SaveMode,
    ) -> Result<WriteSummary> {
        let path = path.as_ref();
        check_batches(&schema, batches)?;

        match (mode, path.exists()) {
            (SaveMode::ErrorIfExists, true) => {
                return Err(CommonError::configuration_error(format!(
                    "output {} already exists",
                    path.display()
                )));
            }
            (SaveMode::Ignore, true) => {
                let bytes = fs::metadata(path)
                    .with_context(|| format!("reading existing output {}", path.display()))?
                    .len();
                info!(path = %path.display(), "output exists, skipping write");
                return Ok(WriteSummary {
                    path: path.to_path_buf(),
                    rows: 0,
                    bytes,
                    attempts: 0,
                });
            }
            _ => {}
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let rows = batches.iter().map(|b| b.num_rows()).sum();
        let (bytes, attempts) = self.retry.run("parquet write", |attempt| {
            debug!(path = %path.display(), attempt, "staging parquet file");
            self.write_once(&parent, path, &schema, batches, mode)
        })?;

        info!(
            path = %path.display(),
            rows,
            bytes,
            attempts,
            compression = %self.compression,
            "Wrote parquet file"
        );
        Ok(WriteSummary {
            path: path.to_path_buf(),
            rows,
            bytes,
            attempts,
        })
    }

    fn write_once(
        &self,
        parent: &Path,
        path: &Path,
        schema: &SchemaRef,
        batches: &[RecordBatch],
        mode: SaveMode,
    ) -> Result<u64> {
        // Dropping `staged` on any early return removes the temporary file.
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(parent)?;

        let props = WriterProperties::builder()
            .set_compression(self.compression.codec())
            .set_created_by(format!("tally {}", env!("CARGO_PKG_VERSION")))
            .build();
        let mut writer = ArrowWriter::try_new(staged.as_file_mut(), schema.clone(), Some(props))?;
        for batch in batches {
            writer.write(batch)?;
        }
        writer.close()?;

        let file = staged.as_file();
        file.sync_all().with_context(|| "flushing staged parquet file".to_string())?;
        let bytes = file.metadata()?.len();

        let persisted = match mode {
            SaveMode::ErrorIfExists => staged.persist_noclobber(path),
            SaveMode::Overwrite | SaveMode::Ignore => staged.persist(path),
        };
        persisted.map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                CommonError::configuration_error_with_source(
                    format!("output {} already exists", path.display()),
                    e.error,
                )
            } else {
                e.error.into()
            }
        })?;
        Ok(bytes)
    }
}

/// Batches from one plan share a schema; anything else is a caller bug and is
/// rejected before a file is staged.
fn check_batches(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<()> {
    for (index, batch) in batches.iter().enumerate() {
        let batch_schema = batch.schema();
        let matches = batch_schema.fields().len() == schema.fields().len()
            && batch_schema
                .fields()
                .iter()
                .zip(schema.fields().iter())
                .all(|(a, b)| a.name() == b.name() && a.data_type() == b.data_type());
        if !matches {
            return Err(CommonError::serialization_error(format!(
                "batch {} has schema {:?}, expected {:?}",
                index,
                batch_schema.fields(),
                schema.fields()
            )));
        }
    }
    Ok(())
}
