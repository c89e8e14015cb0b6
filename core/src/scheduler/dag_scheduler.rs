//! Job planning and execution.
//!
//! `DagScheduler` turns one action into a job: it validates the lineage of
//! the target RDD, runs every shuffle map stage the lineage needs (parents
//! before children, each stage a barrier) and then hands a [`ResultStage`]
//! to the action so it can compute the partitions it needs.

use crate::scheduler::{ComputeFn, JobContext, LocalScheduler, Task};
use crate::shuffle::{MapOutputBlock, ShuffleDependencyBase};
use crate::traits::{
    BasicPartition, Data, Dependency, JobId, Partition, Rdd, RddBase, RddError, RddId, RddResult,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Record of one finished action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub action: String,
    pub target_rdd: RddId,
    pub shuffle_stages: usize,
    pub partitions_computed: usize,
    pub succeeded: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The final stage of a job: computes partitions of the action's target.
pub struct ResultStage<'a, T: Data> {
    rdd: Arc<dyn Rdd<T>>,
    job: Arc<JobContext>,
    scheduler: &'a LocalScheduler,
}

impl<T: Data> ResultStage<'_, T> {
    pub fn num_partitions(&self) -> usize {
        self.rdd.num_partitions()
    }

    fn tasks<R, F>(&self, func: F) -> Vec<Task<R>>
    where
        R: Send + 'static,
        F: Fn(usize, Arc<Vec<T>>) -> RddResult<R> + Send + Sync + 'static,
    {
        let rdd = self.rdd.clone();
        let job = self.job.clone();
        let compute_fn: ComputeFn<R> = Arc::new(move |split: &dyn Partition| {
            job.check_cancelled()?;
            let records = job.materialize(rdd.as_ref(), split)?;
            func(split.index(), records)
        });

        (0..self.num_partitions())
            .map(|i| Task::new(Box::new(BasicPartition::new(i)), compute_fn.clone()))
            .collect()
    }

    /// Apply `func` to every partition in parallel; results are in partition order.
    pub fn run<R, F>(&self, func: F) -> RddResult<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(usize, Arc<Vec<T>>) -> RddResult<R> + Send + Sync + 'static,
    {
        self.scheduler.execute_tasks(self.tasks(func))
    }

    /// All records, concatenated in partition-index order.
    pub fn collect(&self) -> RddResult<Vec<T>> {
        self.scheduler
            .execute_and_collect(self.tasks(|_, records| Ok(records.as_ref().clone())))
    }

    pub fn count(&self) -> RddResult<usize> {
        self.scheduler
            .execute_and_count(self.tasks(|_, records| Ok(records.len())))
    }

    /// Compute a single partition on the calling thread.
    pub fn compute_partition(&self, index: usize) -> RddResult<Arc<Vec<T>>> {
        if index >= self.num_partitions() {
            return Err(RddError::InvalidPartition(index));
        }
        self.job.check_cancelled()?;
        self.job
            .materialize(self.rdd.as_ref(), &BasicPartition::new(index))
    }
}

/// Plans and runs jobs for one context.
#[derive(Debug)]
pub struct DagScheduler {
    scheduler: LocalScheduler,
    next_job_id: AtomicU64,
    cancel: Mutex<CancellationToken>,
    last_job: Mutex<Option<JobSummary>>,
}

impl DagScheduler {
    pub fn new(scheduler: LocalScheduler) -> Self {
        Self {
            scheduler,
            next_job_id: AtomicU64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
            last_job: Mutex::new(None),
        }
    }

    /// Cancel every job currently running. Jobs started afterwards are unaffected.
    pub fn cancel_running_jobs(&self) {
        let mut token = lock(&self.cancel);
        token.cancel();
        *token = CancellationToken::new();
    }

    pub fn last_job_summary(&self) -> Option<JobSummary> {
        lock(&self.last_job).clone()
    }

    /// Run one action against `rdd`.
    ///
    /// Shuffle map stages run to completion before `body` is called; `body`
    /// decides which result partitions to compute and in what order.
    pub fn run_job<T, R, F>(&self, rdd: &Arc<dyn Rdd<T>>, action: &'static str, body: F) -> RddResult<R>
    where
        T: Data,
        F: FnOnce(&ResultStage<'_, T>) -> RddResult<R>,
    {
        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let job = Arc::new(JobContext::new(job_id, lock(&self.cancel).clone()));
        info!(
            job_id,
            action,
            rdd_id = rdd.id(),
            partitions = rdd.num_partitions(),
            "job started"
        );

        let mut shuffle_stages = 0;
        let result = plan_shuffle_stages(rdd.clone().as_rdd_base()).and_then(|stages| {
            shuffle_stages = stages.len();
            for dep in &stages {
                self.run_shuffle_map_stage(dep, &job)?;
            }
            body(&ResultStage {
                rdd: rdd.clone(),
                job: job.clone(),
                scheduler: &self.scheduler,
            })
        });

        let summary = JobSummary {
            job_id,
            action: action.to_string(),
            target_rdd: rdd.id(),
            shuffle_stages,
            partitions_computed: job.partitions_computed(),
            succeeded: result.is_ok(),
        };
        match &result {
            Ok(_) => info!(
                job_id,
                action,
                shuffle_stages,
                partitions_computed = summary.partitions_computed,
                "job finished"
            ),
            Err(e) if e.is_cancelled() => warn!(job_id, action, "job cancelled"),
            Err(e) => warn!(job_id, action, error = %e, "job failed"),
        }
        *lock(&self.last_job) = Some(summary);

        result
    }

    fn run_shuffle_map_stage(
        &self,
        dep: &Arc<dyn ShuffleDependencyBase>,
        job: &Arc<JobContext>,
    ) -> RddResult<()> {
        let shuffle_id = dep.shuffle_id();
        debug!(
            job_id = job.job_id(),
            shuffle_id,
            map_partitions = dep.num_map_partitions(),
            reduce_partitions = dep.num_reduce_partitions(),
            "running shuffle map stage"
        );

        let compute_fn: ComputeFn<MapOutputBlock> = {
            let dep = dep.clone();
            let job = job.clone();
            Arc::new(move |split: &dyn Partition| {
                job.check_cancelled()?;
                dep.run_map_task(split, &job)
            })
        };
        let tasks = (0..dep.num_map_partitions())
            .map(|i| Task::new(Box::new(BasicPartition::new(i)), compute_fn.clone()))
            .collect();

        let outputs = self.scheduler.execute_tasks(tasks)?;
        job.put_shuffle_output(shuffle_id, outputs);
        Ok(())
    }
}

/// Validate the lineage under `root` and list the shuffles it depends on.
///
/// Shuffles are returned in post-order: a shuffle appears after every
/// shuffle its map side depends on. Each shuffle appears once even when
/// several paths reach it.
pub(crate) fn plan_shuffle_stages(
    root: Arc<dyn RddBase>,
) -> RddResult<Vec<Arc<dyn ShuffleDependencyBase>>> {
    let mut visited = HashSet::new();
    let mut planned = HashSet::new();
    let mut stages = Vec::new();
    visit(root, &mut visited, &mut planned, &mut stages)?;
    Ok(stages)
}

fn visit(
    rdd: Arc<dyn RddBase>,
    visited: &mut HashSet<RddId>,
    planned: &mut HashSet<usize>,
    stages: &mut Vec<Arc<dyn ShuffleDependencyBase>>,
) -> RddResult<()> {
    if !visited.insert(rdd.id()) {
        return Ok(());
    }
    if rdd.num_partitions() == 0 {
        return Err(RddError::Partitioning(format!(
            "{} requests zero partitions",
            rdd.describe()
        )));
    }

    for dep in rdd.dependencies() {
        match dep {
            Dependency::Narrow(parent) => visit(parent, visited, planned, stages)?,
            Dependency::Shuffle(shuffle) => {
                visit(shuffle.parent(), visited, planned, stages)?;
                if planned.insert(shuffle.shuffle_id()) {
                    stages.push(shuffle);
                }
            }
        }
    }
    Ok(())
}
