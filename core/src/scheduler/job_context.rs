//! Per-job execution state.
//!
//! A `JobContext` lives exactly as long as one action. It memoizes every
//! partition materialized during the job, so a partition reached through
//! several lineage paths is computed once, and it holds the map outputs of
//! the shuffles the job ran. Nothing survives the action.

use crate::shuffle::MapOutputBlock;
use crate::traits::{Data, JobId, Partition, Rdd, RddError, RddId, RddResult, ShuffleId};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type AnyBlock = Arc<dyn Any + Send + Sync>;
type BlockSlot = Arc<Mutex<Option<AnyBlock>>>;

/// Key of a memoized block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BlockKey {
    /// Records of one partition of an RDD.
    Partition { rdd_id: RddId, split: usize },
    /// Whole input of a source RDD, shared by all of its partitions.
    Source { rdd_id: RddId },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Execution state shared by all tasks of one job.
pub struct JobContext {
    job_id: JobId,
    cancel: CancellationToken,
    blocks: Mutex<HashMap<BlockKey, BlockSlot>>,
    shuffle_outputs: RwLock<HashMap<ShuffleId, Arc<Vec<MapOutputBlock>>>>,
    partitions_computed: AtomicUsize,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("partitions_computed", &self.partitions_computed())
            .finish()
    }
}

impl JobContext {
    pub(crate) fn new(job_id: JobId, cancel: CancellationToken) -> Self {
        Self {
            job_id,
            cancel,
            blocks: Mutex::new(HashMap::new()),
            shuffle_outputs: RwLock::new(HashMap::new()),
            partitions_computed: AtomicUsize::new(0),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Fails with `Cancelled` once the job's token has been cancelled.
    pub fn check_cancelled(&self) -> RddResult<()> {
        if self.cancel.is_cancelled() {
            Err(RddError::Cancelled {
                job_id: self.job_id,
            })
        } else {
            Ok(())
        }
    }

    /// Number of partitions computed (not served from the memo) so far.
    pub fn partitions_computed(&self) -> usize {
        self.partitions_computed.load(Ordering::Relaxed)
    }

    /// Compute a partition of `rdd`, or return it if this job already did.
    pub fn materialize<T: Data>(
        &self,
        rdd: &dyn Rdd<T>,
        split: &dyn Partition,
    ) -> RddResult<Arc<Vec<T>>> {
        let key = BlockKey::Partition {
            rdd_id: rdd.id(),
            split: split.index(),
        };
        self.get_or_load(key, || {
            let records = rdd.compute(split, self)?;
            self.partitions_computed.fetch_add(1, Ordering::Relaxed);
            debug!(
                job_id = self.job_id,
                rdd_id = rdd.id(),
                kind = %rdd.kind(),
                partition = split.index(),
                records = records.len(),
                "computed partition"
            );
            Ok(records)
        })
    }

    /// Return the block stored under `key`, loading it on first use.
    ///
    /// Concurrent callers for the same key wait for the first load instead
    /// of repeating it. Failed loads are not memoized.
    pub(crate) fn get_or_load<V, F>(&self, key: BlockKey, load: F) -> RddResult<Arc<V>>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> RddResult<V>,
    {
        let slot = lock(&self.blocks).entry(key).or_default().clone();
        let mut guard = lock(&slot);

        if let Some(block) = guard.as_ref() {
            return block.clone().downcast::<V>().map_err(|_| {
                RddError::Internal(format!("memoized block {key:?} has an unexpected type"))
            });
        }

        let value = Arc::new(load()?);
        *guard = Some(value.clone() as AnyBlock);
        Ok(value)
    }

    pub(crate) fn put_shuffle_output(&self, shuffle_id: ShuffleId, outputs: Vec<MapOutputBlock>) {
        self.shuffle_outputs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(shuffle_id, Arc::new(outputs));
    }

    pub(crate) fn shuffle_output(&self, shuffle_id: ShuffleId) -> RddResult<Arc<Vec<MapOutputBlock>>> {
        self.shuffle_outputs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&shuffle_id)
            .cloned()
            .ok_or_else(|| {
                RddError::Internal(format!(
                    "shuffle {shuffle_id} was read before its map stage ran"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_load_memoizes() {
        let job = JobContext::new(0, CancellationToken::new());
        let key = BlockKey::Source { rdd_id: 1 };
        let mut loads = 0;

        let first: Arc<Vec<i32>> = job
            .get_or_load(key, || {
                loads += 1;
                Ok(vec![1, 2, 3])
            })
            .unwrap();
        let second: Arc<Vec<i32>> = job
            .get_or_load(key, || {
                loads += 1;
                Ok(vec![])
            })
            .unwrap();

        assert_eq!(loads, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_load_is_not_memoized() {
        let job = JobContext::new(0, CancellationToken::new());
        let key = BlockKey::Partition { rdd_id: 3, split: 0 };

        let failed: RddResult<Arc<Vec<i32>>> =
            job.get_or_load(key, || Err(RddError::Internal("boom".into())));
        assert!(failed.is_err());

        let loaded: Arc<Vec<i32>> = job.get_or_load(key, || Ok(vec![7])).unwrap();
        assert_eq!(*loaded, vec![7]);
    }

    #[test]
    fn test_check_cancelled() {
        let token = CancellationToken::new();
        let job = JobContext::new(9, token.clone());
        assert!(job.check_cancelled().is_ok());

        token.cancel();
        let err = job.check_cancelled().unwrap_err();
        assert!(matches!(err, RddError::Cancelled { job_id: 9 }));
    }

    #[test]
    fn test_missing_shuffle_output() {
        let job = JobContext::new(0, CancellationToken::new());
        assert!(matches!(job.shuffle_output(4), Err(RddError::Internal(_))));

        job.put_shuffle_output(4, vec![Arc::new(vec![vec![(1, 1)]]) as MapOutputBlock]);
        assert_eq!(job.shuffle_output(4).unwrap().len(), 1);
    }
}
