//! Error handling for the tally-common crate.

use thiserror::Error;

/// Common error type that abstracts over underlying library errors.
///
/// Every variant carries a human readable message and an optional source so
/// that engine failures (DataFusion, Arrow, Parquet, the file system) keep
/// their original cause when they cross a crate boundary.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("IO operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Storage operation failed: {message}")]
    StorageError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Serialization failed: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Query execution failed: {message}")]
    ExecutionError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Timeout occurred: {message}")]
    TimeoutError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Resource not found: {message}")]
    NotFoundError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Permission denied: {message}")]
    PermissionError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Resource exhausted: {message}")]
    ResourceExhaustedError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Error severity levels for categorizing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Low severity - operation can continue with degraded functionality
    Low,
    /// Medium severity - operation should be retried or alternative approach used
    Medium,
    /// High severity - operation must be aborted but system can continue
    High,
    /// Critical severity - system integrity is at risk
    Critical,
}

/// Error category for grouping related error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Storage and file system errors
    Infrastructure,
    /// Encoding, query planning and execution errors
    DataProcessing,
    /// Configuration and setup errors
    Configuration,
    /// Resource management errors (memory, file handles, etc.)
    Resource,
    /// Security and permission errors
    Security,
    /// Internal logic errors
    Internal,
}

/// Trait for rich error diagnostics with context and suggestions.
pub trait Diagnose {
    /// Get the error severity level.
    fn severity(&self) -> ErrorSeverity;

    /// Get the error category.
    fn category(&self) -> ErrorCategory;

    /// Get additional context about the error.
    fn context(&self) -> Vec<String>;

    /// Get suggestions for resolving the error.
    fn suggestions(&self) -> Vec<String>;

    /// Check if the error is transient and the operation may succeed when retried.
    fn is_retryable(&self) -> bool;

    /// Get the recommended base retry delay in milliseconds.
    fn retry_delay_ms(&self) -> Option<u64>;
}

macro_rules! constructors {
    ($($variant:ident => $plain:ident, $with_source:ident;)*) => {
        impl CommonError {
            $(
                #[doc = concat!("Create a `", stringify!($variant), "` with a custom message.")]
                pub fn $plain<S: Into<String>>(message: S) -> Self {
                    Self::$variant {
                        message: message.into(),
                        source: None,
                    }
                }

                #[doc = concat!("Create a `", stringify!($variant), "` with a custom message and source error.")]
                pub fn $with_source<S: Into<String>, E: Into<anyhow::Error>>(
                    message: S,
                    source: E,
                ) -> Self {
                    Self::$variant {
                        message: message.into(),
                        source: Some(source.into()),
                    }
                }
            )*
        }
    };
}

constructors! {
    ConfigurationError => configuration_error, configuration_error_with_source;
    IoError => io_error, io_error_with_source;
    StorageError => storage_error, storage_error_with_source;
    SerializationError => serialization_error, serialization_error_with_source;
    ExecutionError => execution_error, execution_error_with_source;
    TimeoutError => timeout_error, timeout_error_with_source;
    NotFoundError => not_found_error, not_found_error_with_source;
    PermissionError => permission_error, permission_error_with_source;
    ResourceExhaustedError => resource_exhausted_error, resource_exhausted_error_with_source;
    InternalError => internal_error, internal_error_with_source;
}

impl CommonError {
    /// The message the error was created with, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            CommonError::ConfigurationError { message, .. }
            | CommonError::IoError { message, .. }
            | CommonError::StorageError { message, .. }
            | CommonError::SerializationError { message, .. }
            | CommonError::ExecutionError { message, .. }
            | CommonError::TimeoutError { message, .. }
            | CommonError::NotFoundError { message, .. }
            | CommonError::PermissionError { message, .. }
            | CommonError::ResourceExhaustedError { message, .. }
            | CommonError::InternalError { message, .. } => message,
        }
    }

    fn prefix_message(mut self, prefix: String) -> Self {
        match &mut self {
            CommonError::ConfigurationError { message, .. }
            | CommonError::IoError { message, .. }
            | CommonError::StorageError { message, .. }
            | CommonError::SerializationError { message, .. }
            | CommonError::ExecutionError { message, .. }
            | CommonError::TimeoutError { message, .. }
            | CommonError::NotFoundError { message, .. }
            | CommonError::PermissionError { message, .. }
            | CommonError::ResourceExhaustedError { message, .. }
            | CommonError::InternalError { message, .. } => {
                *message = format!("{}: {}", prefix, message);
            }
        }
        self
    }
}

impl Diagnose for CommonError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            CommonError::ConfigurationError { .. } => ErrorSeverity::High,
            CommonError::IoError { .. } => ErrorSeverity::Medium,
            CommonError::StorageError { .. } => ErrorSeverity::High,
            CommonError::SerializationError { .. } => ErrorSeverity::Medium,
            CommonError::ExecutionError { .. } => ErrorSeverity::High,
            CommonError::TimeoutError { .. } => ErrorSeverity::Medium,
            CommonError::NotFoundError { .. } => ErrorSeverity::Low,
            CommonError::PermissionError { .. } => ErrorSeverity::High,
            CommonError::ResourceExhaustedError { .. } => ErrorSeverity::High,
            CommonError::InternalError { .. } => ErrorSeverity::Critical,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            CommonError::ConfigurationError { .. } => ErrorCategory::Configuration,
            CommonError::IoError { .. } => ErrorCategory::Infrastructure,
            CommonError::StorageError { .. } => ErrorCategory::Infrastructure,
            CommonError::SerializationError { .. } => ErrorCategory::DataProcessing,
            CommonError::ExecutionError { .. } => ErrorCategory::DataProcessing,
            CommonError::TimeoutError { .. } => ErrorCategory::Infrastructure,
            CommonError::NotFoundError { .. } => ErrorCategory::Resource,
            CommonError::PermissionError { .. } => ErrorCategory::Security,
            CommonError::ResourceExhaustedError { .. } => ErrorCategory::Resource,
            CommonError::InternalError { .. } => ErrorCategory::Internal,
        }
    }

    fn context(&self) -> Vec<String> {
        let mut context = Vec::new();

        match self {
            CommonError::ConfigurationError { message, .. } => {
                context.push(format!("Configuration context: {}", message));
                context
                    .push("This indicates invalid or missing configuration parameters".to_string());
            }
            CommonError::IoError { message, .. } => {
                context.push(format!("I/O operation context: {}", message));
                context.push("This may indicate file system contention or a full disk".to_string());
            }
            CommonError::StorageError { message, .. } => {
                context.push(format!("Storage operation context: {}", message));
                context.push(
                    "This may indicate disk space, permissions, or an interrupted write"
                        .to_string(),
                );
            }
            CommonError::SerializationError { message, .. } => {
                context.push(format!("Serialization context: {}", message));
                context.push(
                    "This may indicate a schema mismatch between batches and the writer"
                        .to_string(),
                );
            }
            CommonError::ExecutionError { message, .. } => {
                context.push(format!("Query execution context: {}", message));
                context.push("This indicates a plan failed to build or to execute".to_string());
            }
            CommonError::TimeoutError { message, .. } => {
                context.push(format!("Timeout context: {}", message));
                context.push("This indicates an operation took longer than expected".to_string());
            }
            CommonError::NotFoundError { message, .. } => {
                context.push(format!("Resource not found context: {}", message));
                context.push("This indicates a requested resource does not exist".to_string());
            }
            CommonError::PermissionError { message, .. } => {
                context.push(format!("Permission context: {}", message));
                context.push(
                    "This indicates insufficient privileges for the requested operation"
                        .to_string(),
                );
            }
            CommonError::ResourceExhaustedError { message, .. } => {
                context.push(format!("Resource exhaustion context: {}", message));
                context.push(
                    "This indicates system resources (memory, disk, etc.) are exhausted"
                        .to_string(),
                );
            }
            CommonError::InternalError { message, .. } => {
                context.push(format!("Internal error context: {}", message));
                context.push("This indicates an unexpected internal condition".to_string());
            }
        }

        context
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            CommonError::ConfigurationError { .. } => vec![
                "Review the command-line arguments and their allowed ranges".to_string(),
                "Check for missing required configuration parameters".to_string(),
            ],
            CommonError::IoError { .. } => vec![
                "Check file system permissions and disk space".to_string(),
                "Verify the output path is reachable".to_string(),
            ],
            CommonError::StorageError { .. } => vec![
                "Check disk space and file system permissions".to_string(),
                "Verify the output directory is not on a read-only mount".to_string(),
                "Remove stale temporary files left by an interrupted run".to_string(),
            ],
            CommonError::SerializationError { .. } => vec![
                "Verify every batch shares the same schema".to_string(),
                "Check the configured compression codec is supported".to_string(),
            ],
            CommonError::ExecutionError { .. } => vec![
                "Check column names referenced by the plan".to_string(),
                "Run with -vv to see the plan that failed".to_string(),
            ],
            CommonError::TimeoutError { .. } => vec![
                "Increase timeout values if appropriate".to_string(),
                "Check system performance and load".to_string(),
            ],
            CommonError::NotFoundError { .. } => vec![
                "Verify resource path and identifier".to_string(),
                "Check if resource was moved or deleted".to_string(),
            ],
            CommonError::PermissionError { .. } => vec![
                "Check user permissions and access rights".to_string(),
                "Choose an output directory owned by the current user".to_string(),
            ],
            CommonError::ResourceExhaustedError { .. } => vec![
                "Reduce the row count or the configured parallelism".to_string(),
                "Free disk space in the output directory".to_string(),
            ],
            CommonError::InternalError { .. } => vec![
                "Report this issue with the full log output".to_string(),
                "Re-run with a fixed --seed to reproduce".to_string(),
            ],
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            CommonError::ConfigurationError { .. } => false,
            CommonError::IoError { .. } => true,
            CommonError::StorageError { .. } => true,
            CommonError::SerializationError { .. } => false,
            CommonError::ExecutionError { .. } => false,
            CommonError::TimeoutError { .. } => true,
            CommonError::NotFoundError { .. } => false,
            CommonError::PermissionError { .. } => false,
            CommonError::ResourceExhaustedError { .. } => true,
            CommonError::InternalError { .. } => false,
        }
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        if !self.is_retryable() {
            return None;
        }

        match self {
            CommonError::IoError { .. } => Some(50),
            CommonError::StorageError { .. } => Some(100),
            CommonError::TimeoutError { .. } => Some(250),
            CommonError::ResourceExhaustedError { .. } => Some(500),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let message = error.to_string();
        match error.kind() {
            ErrorKind::NotFound => CommonError::not_found_error_with_source(message, error),
            ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
                CommonError::permission_error_with_source(message, error)
            }
            ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                CommonError::timeout_error_with_source(message, error)
            }
            ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
                CommonError::resource_exhausted_error_with_source(message, error)
            }
            ErrorKind::InvalidInput | ErrorKind::NotADirectory | ErrorKind::IsADirectory => {
                CommonError::configuration_error_with_source(message, error)
            }
            _ => CommonError::io_error_with_source(message, error),
        }
    }
}

impl From<datafusion::error::DataFusionError> for CommonError {
    fn from(error: datafusion::error::DataFusionError) -> Self {
        use datafusion::error::DataFusionError;

        match error {
            DataFusionError::IoError(io) => io.into(),
            DataFusionError::ResourcesExhausted(message) => {
                CommonError::resource_exhausted_error(message)
            }
            DataFusionError::Configuration(message) => CommonError::configuration_error(message),
            other => CommonError::execution_error_with_source(other.to_string(), other),
        }
    }
}

impl From<datafusion::arrow::error::ArrowError> for CommonError {
    fn from(error: datafusion::arrow::error::ArrowError) -> Self {
        CommonError::serialization_error_with_source(error.to_string(), error)
    }
}

impl From<parquet::errors::ParquetError> for CommonError {
    fn from(error: parquet::errors::ParquetError) -> Self {
        CommonError::storage_error_with_source(error.to_string(), error)
    }
}

/// Context helpers for adding rich context to errors.
pub mod context {
    use super::*;

    /// Extension trait for adding context to Results.
    pub trait ErrorContext<T> {
        /// Prefix the error message with `f()`. The error keeps the variant its
        /// `From` conversion picked, so retryability is unchanged.
        fn with_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;
    }

    impl<T, E> ErrorContext<T> for std::result::Result<T, E>
    where
        E: Into<CommonError>,
    {
        fn with_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| e.into().prefix_message(f()))
        }
    }
}

pub use context::ErrorContext;
