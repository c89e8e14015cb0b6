//! FlowContext - Local execution context for RDD operations
//!
//! This module provides the driver entry point: it owns the configuration,
//! the block store sources read from, and the scheduler every action runs on.

use crate::context::ContextConfig;
use crate::rdd::{DistributedRdd, ParallelCollectionRdd, TextFileRdd};
use crate::scheduler::{DagScheduler, JobSummary, LocalScheduler};
use crate::traits::{Data, RddId, RddResult, ShuffleId};
use sparklet_common::BlockStore;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;
use uuid::Uuid;

struct ContextInner {
    app_id: String,
    config: ContextConfig,
    store: Arc<dyn BlockStore>,
    dag_scheduler: DagScheduler,
    next_rdd_id: AtomicUsize,
    next_shuffle_id: AtomicUsize,
}

/// FlowContext creates root RDDs and runs the actions invoked on them.
///
/// Cloning is cheap; clones share the same scheduler and id counters.
#[derive(Clone)]
pub struct FlowContext {
    inner: Arc<ContextInner>,
}

impl Debug for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowContext")
            .field("app_id", &self.inner.app_id)
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .finish()
    }
}

impl FlowContext {
    /// Create a new FlowContext with the given application name and default settings
    pub fn new(app_name: impl Into<String>, store: Arc<dyn BlockStore>) -> RddResult<Self> {
        Self::with_config(ContextConfig::new(app_name), store)
    }

    pub fn with_config(config: ContextConfig, store: Arc<dyn BlockStore>) -> RddResult<Self> {
        config.validate()?;
        let scheduler = LocalScheduler::new(config.max_concurrency)?;
        let app_id = format!("{}-{}", config.app_name, Uuid::new_v4());
        info!(
            app_id = %app_id,
            default_parallelism = config.default_parallelism,
            max_concurrency = config.max_concurrency,
            "context started"
        );

        Ok(Self {
            inner: Arc::new(ContextInner {
                app_id,
                config,
                store,
                dag_scheduler: DagScheduler::new(scheduler),
                next_rdd_id: AtomicUsize::new(0),
                next_shuffle_id: AtomicUsize::new(0),
            }),
        })
    }

    pub fn app_name(&self) -> &str {
        &self.inner.config.app_name
    }

    pub fn app_id(&self) -> &str {
        &self.inner.app_id
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    pub fn default_parallelism(&self) -> usize {
        self.inner.config.default_parallelism
    }

    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.inner.store
    }

    pub(crate) fn dag_scheduler(&self) -> &DagScheduler {
        &self.inner.dag_scheduler
    }

    pub(crate) fn new_rdd_id(&self) -> RddId {
        self.inner.next_rdd_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn new_shuffle_id(&self) -> ShuffleId {
        self.inner.next_shuffle_id.fetch_add(1, Ordering::SeqCst)
    }

    /// One record per line of the object at `path`, split into
    /// `default_parallelism` contiguous partitions.
    pub fn text_file(&self, path: impl Into<String>) -> DistributedRdd<String> {
        self.text_file_with_partitions(path, self.default_parallelism())
    }

    pub fn text_file_with_partitions(
        &self,
        path: impl Into<String>,
        num_partitions: usize,
    ) -> DistributedRdd<String> {
        let rdd = TextFileRdd::new(
            self.new_rdd_id(),
            path,
            self.inner.store.clone(),
            num_partitions,
        );
        DistributedRdd::new(Arc::new(rdd), self.clone())
    }

    /// Create an RDD from a vector of data
    pub fn parallelize<T: Data>(&self, data: Vec<T>) -> DistributedRdd<T> {
        self.parallelize_with_partitions(data, self.default_parallelism())
    }

    /// Create an RDD from a vector with specified number of partitions
    pub fn parallelize_with_partitions<T: Data>(
        &self,
        data: Vec<T>,
        num_partitions: usize,
    ) -> DistributedRdd<T> {
        let rdd = ParallelCollectionRdd::new(self.new_rdd_id(), data, num_partitions);
        DistributedRdd::new(Arc::new(rdd), self.clone())
    }

    /// Cancel every action currently running on this context.
    ///
    /// Running partitions finish; no further partition of those actions starts.
    pub fn cancel_running_jobs(&self) {
        info!(app_id = %self.inner.app_id, "cancelling running jobs");
        self.inner.dag_scheduler.cancel_running_jobs();
    }

    pub fn last_job_summary(&self) -> Option<JobSummary> {
        self.inner.dag_scheduler.last_job_summary()
    }

    /// Cancel running actions and shut the context down.
    pub fn stop(self) {
        self.inner.dag_scheduler.cancel_running_jobs();
        info!(app_id = %self.inner.app_id, "context stopped");
    }
}
