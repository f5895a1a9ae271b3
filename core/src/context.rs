//! The main context for a Tally application.
//!
//! A [`TallyContext`] owns the two execution resources a job needs: a rayon
//! thread pool for RDD actions and a DataFusion `SessionContext` for
//! dataframe plans. It is created once at job start, handed to every stage by
//! reference, and stopped exactly once, either explicitly through
//! [`TallyContext::stop`] or implicitly when it is dropped.

use crate::rdd::{ParallelCollection, Rdd};
use crate::traits::{Data, RddError, RddResult};
use datafusion::execution::context::SessionContext;
use datafusion::prelude::SessionConfig;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tally_common::{CommonError, Result};
use tracing::{debug, info};

/// Settings used to build a [`TallyContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub app_name: String,
    /// Worker threads for RDD actions and target partitions for dataframe plans.
    pub parallelism: usize,
    /// Rows per record batch produced by DataFusion operators.
    pub batch_size: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "tally-app".to_string(),
            parallelism: num_cpus::get(),
            batch_size: 8192,
        }
    }
}

impl ContextConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(CommonError::configuration_error(
                "application name must not be empty",
            ));
        }
        if self.parallelism == 0 {
            return Err(CommonError::configuration_error(
                "parallelism must be at least 1",
            ));
        }
        if self.batch_size == 0 {
            return Err(CommonError::configuration_error(
                "batch size must be at least 1",
            ));
        }
        Ok(())
    }
}

pub(crate) struct ContextInner {
    config: ContextConfig,
    pool: rayon::ThreadPool,
    df_session_ctx: SessionContext,
    next_rdd_id: AtomicUsize,
    stopped: AtomicBool,
}

/// A cheap, cloneable reference to the resources of a [`TallyContext`].
///
/// RDDs and dataframes hold a handle rather than the context itself, so they
/// observe when the owning context is stopped and refuse to run afterwards.
#[derive(Clone)]
pub struct ContextHandle {
    inner: Arc<ContextInner>,
}

impl ContextHandle {
    /// The application name the context was created with.
    pub fn app_name(&self) -> &str {
        &self.inner.config.app_name
    }

    /// Number of worker threads and default partition count.
    pub fn default_parallelism(&self) -> usize {
        self.inner.config.parallelism
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Fails with [`RddError::ContextStopped`] once the owning context has stopped.
    pub fn ensure_active(&self) -> RddResult<()> {
        if self.is_stopped() {
            Err(RddError::ContextStopped(self.app_name().to_string()))
        } else {
            Ok(())
        }
    }

    /// Returns a clone of the underlying DataFusion `SessionContext`.
    pub fn df_session_ctx(&self) -> SessionContext {
        self.inner.df_session_ctx.clone()
    }

    /// Runs `op` inside the context's worker pool.
    pub(crate) fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.inner.pool.install(op)
    }

    pub(crate) fn new_rdd_id(&self) -> usize {
        self.inner.next_rdd_id.fetch_add(1, Ordering::Relaxed)
    }

    fn stop(&self) -> bool {
        !self.inner.stopped.swap(true, Ordering::SeqCst)
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("app_name", &self.app_name())
            .field("parallelism", &self.default_parallelism())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// `TallyContext` is the main entry point for Tally functionality.
///
/// It is deliberately not `Clone`: exactly one owner decides when the
/// application ends. Pass it to stages by reference.
#[derive(Debug)]
pub struct TallyContext {
    handle: ContextHandle,
}

impl TallyContext {
    /// Creates a new context from `config`.
    pub fn new(config: ContextConfig) -> Result<Self> {
        config.validate()?;

        let thread_prefix = config.app_name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism)
            .thread_name(move |index| format!("{}-worker-{}", thread_prefix, index))
            .build()
            .map_err(|e| {
                CommonError::configuration_error_with_source("failed to build worker pool", e)
            })?;

        let session_config = SessionConfig::new()
            .with_target_partitions(config.parallelism)
            .with_batch_size(config.batch_size);
        let df_session_ctx = SessionContext::new_with_config(session_config);

        info!(
            app_name = %config.app_name,
            parallelism = config.parallelism,
            batch_size = config.batch_size,
            "Context started"
        );

        Ok(Self {
            handle: ContextHandle {
                inner: Arc::new(ContextInner {
                    config,
                    pool,
                    df_session_ctx,
                    next_rdd_id: AtomicUsize::new(1),
                    stopped: AtomicBool::new(false),
                }),
            },
        })
    }

    /// Creates a new context named `app_name` with default settings.
    pub fn with_app_name(app_name: impl Into<String>) -> Result<Self> {
        Self::new(ContextConfig::new(app_name))
    }

    /// Get the application name
    pub fn app_name(&self) -> &str {
        self.handle.app_name()
    }

    pub fn default_parallelism(&self) -> usize {
        self.handle.default_parallelism()
    }

    /// A handle to this context's resources.
    pub fn handle(&self) -> ContextHandle {
        self.handle.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.handle.is_stopped()
    }

    /// Returns a clone of the underlying DataFusion `SessionContext`.
    pub fn df_session_ctx(&self) -> SessionContext {
        self.handle.df_session_ctx()
    }

    /// Create an RDD from a vector of data split into `default_parallelism` partitions
    pub fn parallelize<T: Data>(&self, data: Vec<T>) -> Rdd<T> {
        self.parallelize_with_partitions(data, self.default_parallelism())
    }

    /// Create an RDD from a vector with specified number of partitions
    pub fn parallelize_with_partitions<T: Data>(&self, data: Vec<T>, num_partitions: usize) -> Rdd<T> {
        let id = self.handle.new_rdd_id();
        debug!(rdd_id = id, rows = data.len(), num_partitions, "parallelize");
        Rdd::from_node(
            self.handle.clone(),
            Arc::new(ParallelCollection::new(id, data, num_partitions)),
        )
    }

    /// Stops the context. Later actions on its RDDs and dataframes fail.
    ///
    /// Calling `stop` more than once is a no-op.
    pub fn stop(&self) {
        if self.handle.stop() {
            info!(app_name = %self.app_name(), "Context stopped");
        }
    }
}

impl Drop for TallyContext {
    fn drop(&mut self) {
        self.stop();
    }
}
