//! Local Task Scheduler
//!
//! This module provides a local task scheduler that uses a dedicated Rayon
//! thread pool to execute one task per partition in parallel on a single machine.

use crate::traits::{Partition, RddError, RddResult};
use rayon::prelude::*;
use std::fmt::Debug;
use std::sync::Arc;

/// Task represents a unit of work to be executed
pub struct Task<T> {
    pub partition: Box<dyn Partition>,
    pub compute_fn: ComputeFn<T>,
}

/// Type alias for complex compute function type
pub type ComputeFn<T> = Arc<dyn Fn(&dyn Partition) -> RddResult<T> + Send + Sync>;

impl<T> Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("partition", &self.partition)
            .field("compute_fn", &"<function>")
            .finish()
    }
}

impl<T> Task<T> {
    pub fn new(partition: Box<dyn Partition>, compute_fn: ComputeFn<T>) -> Self {
        Self {
            partition,
            compute_fn,
        }
    }

    pub fn execute(&self) -> RddResult<T> {
        (self.compute_fn)(self.partition.as_ref())
    }
}

/// LocalScheduler manages parallel execution of tasks using Rayon
#[derive(Debug)]
pub struct LocalScheduler {
    /// Number of threads in the thread pool
    num_threads: usize,
    pool: rayon::ThreadPool,
}

impl LocalScheduler {
    /// Create a new LocalScheduler with the specified number of threads
    pub fn new(num_threads: usize) -> RddResult<Self> {
        if num_threads == 0 {
            return Err(RddError::Configuration(
                "scheduler needs at least one thread".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("sparklet-worker-{i}"))
            .build()
            .map_err(|e| RddError::Configuration(format!("cannot build worker pool: {e}")))?;
        Ok(Self { num_threads, pool })
    }

    /// Create a new LocalScheduler with the default number of threads (CPU cores)
    pub fn with_default_threads() -> RddResult<Self> {
        Self::new(num_cpus::get())
    }

    /// Get the number of threads
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Execute a collection of tasks in parallel.
    ///
    /// Results are returned in task order. The first failure aborts the
    /// remaining tasks and is returned.
    pub fn execute_tasks<T>(&self, tasks: Vec<Task<T>>) -> RddResult<Vec<T>>
    where
        T: Send,
    {
        if tasks.len() <= 1 {
            return tasks.iter().map(Task::execute).collect();
        }
        self.pool
            .install(|| tasks.into_par_iter().map(|task| task.execute()).collect())
    }

    /// Execute a collection of tasks and collect all results into a single vector
    pub fn execute_and_collect<T>(&self, tasks: Vec<Task<Vec<T>>>) -> RddResult<Vec<T>>
    where
        T: Send,
    {
        let partition_results = self.execute_tasks(tasks)?;
        Ok(partition_results.into_iter().flatten().collect())
    }

    /// Execute a collection of tasks and count the total number of elements
    pub fn execute_and_count(&self, tasks: Vec<Task<usize>>) -> RddResult<usize> {
        Ok(self.execute_tasks(tasks)?.into_iter().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BasicPartition;

    fn create_test_tasks(num_tasks: usize) -> Vec<Task<Vec<i32>>> {
        (0..num_tasks)
            .map(|i| {
                let compute_fn: ComputeFn<Vec<i32>> = Arc::new(move |p: &dyn Partition| {
                    Ok(vec![(p.index() * 10) as i32, (p.index() * 10 + 1) as i32])
                });
                Task::new(Box::new(BasicPartition::new(i)), compute_fn)
            })
            .collect()
    }

    #[test]
    fn test_local_scheduler_new() {
        let scheduler = LocalScheduler::new(4).unwrap();
        assert_eq!(scheduler.num_threads(), 4);
        assert!(LocalScheduler::new(0).is_err());
    }

    #[test]
    fn test_local_scheduler_with_default_threads() {
        let scheduler = LocalScheduler::with_default_threads().unwrap();
        assert!(scheduler.num_threads() > 0);
    }

    #[test]
    fn test_execute_tasks_keeps_partition_order() {
        let scheduler = LocalScheduler::new(3).unwrap();
        let results = scheduler.execute_tasks(create_test_tasks(3)).unwrap();

        assert_eq!(results, vec![vec![0, 1], vec![10, 11], vec![20, 21]]);
    }

    #[test]
    fn test_execute_and_collect() {
        let scheduler = LocalScheduler::new(2).unwrap();
        let result = scheduler.execute_and_collect(create_test_tasks(3)).unwrap();

        assert_eq!(result, vec![0, 1, 10, 11, 20, 21]);
    }

    #[test]
    fn test_execute_and_count() {
        let scheduler = LocalScheduler::new(2).unwrap();
        let tasks = create_test_tasks(5)
            .into_iter()
            .map(|t| {
                let inner = t.compute_fn.clone();
                let count: ComputeFn<usize> = Arc::new(move |p: &dyn Partition| Ok(inner(p)?.len()));
                Task::new(t.partition, count)
            })
            .collect();

        assert_eq!(scheduler.execute_and_count(tasks).unwrap(), 10);
    }

    #[test]
    fn test_first_error_is_returned() {
        let scheduler = LocalScheduler::new(2).unwrap();
        let tasks: Vec<Task<usize>> = (0..4)
            .map(|i| {
                let compute_fn: ComputeFn<usize> = Arc::new(|p: &dyn Partition| {
                    if p.index() == 2 {
                        Err(RddError::InvalidPartition(2))
                    } else {
                        Ok(p.index())
                    }
                });
                Task::new(Box::new(BasicPartition::new(i)), compute_fn)
            })
            .collect();

        let err = scheduler.execute_tasks(tasks).unwrap_err();
        assert_eq!(err.partition(), Some(2));
    }
}
