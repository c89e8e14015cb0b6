//! Root RDDs: in-memory collections and line-delimited text from a block store.

use crate::scheduler::JobContext;
use crate::scheduler::job_context::BlockKey;
use crate::traits::{
    Data, Dependency, Partition, Rdd, RddBase, RddError, RddId, RddResult, TransformKind,
};
use sparklet_common::BlockStore;
use std::fmt::{self, Debug};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Contiguous slice of `len` records owned by partition `index` of `num_partitions`.
///
/// Every partition but the trailing ones holds `ceil(len / num_partitions)`
/// records; trailing partitions may be short or empty.
pub(crate) fn partition_range(len: usize, num_partitions: usize, index: usize) -> Range<usize> {
    if num_partitions == 0 {
        return 0..0;
    }
    let size = len.div_ceil(num_partitions);
    let start = (index * size).min(len);
    let end = (start + size).min(len);
    start..end
}

/// RDD backed by an in-memory vector.
pub struct ParallelCollectionRdd<T: Data> {
    id: RddId,
    data: Arc<Vec<T>>,
    num_partitions: usize,
}

impl<T: Data> ParallelCollectionRdd<T> {
    pub fn new(id: RddId, data: Vec<T>, num_partitions: usize) -> Self {
        Self {
            id,
            data: Arc::new(data),
            num_partitions,
        }
    }
}

impl<T: Data> Debug for ParallelCollectionRdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelCollectionRdd")
            .field("id", &self.id)
            .field("data_len", &self.data.len())
            .field("num_partitions", &self.num_partitions)
            .finish()
    }
}

impl<T: Data> RddBase for ParallelCollectionRdd<T> {
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Parallelize
    }

    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }
}

impl<T: Data> Rdd<T> for ParallelCollectionRdd<T> {
    fn compute(&self, split: &dyn Partition, _job: &JobContext) -> RddResult<Vec<T>> {
        let index = split.index();
        if index >= self.num_partitions {
            return Err(RddError::InvalidPartition(index));
        }
        Ok(self.data[partition_range(self.data.len(), self.num_partitions, index)].to_vec())
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}

/// One record per line of a text object in the block store.
///
/// The object is read on first evaluation of any partition and shared by
/// the remaining partitions of the same job.
#[derive(Debug)]
pub struct TextFileRdd {
    id: RddId,
    path: String,
    store: Arc<dyn BlockStore>,
    num_partitions: usize,
}

impl TextFileRdd {
    pub fn new(
        id: RddId,
        path: impl Into<String>,
        store: Arc<dyn BlockStore>,
        num_partitions: usize,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            store,
            num_partitions,
        }
    }

    fn load(&self) -> RddResult<Vec<String>> {
        let not_found = || RddError::SourceNotFound {
            path: self.path.clone(),
        };
        if !self.store.exists(&self.path)? {
            return Err(not_found());
        }
        let lines = self.store.read(&self.path).map_err(|e| {
            if e.is_not_found() {
                not_found()
            } else {
                RddError::Storage(e)
            }
        })?;
        debug!(rdd_id = self.id, path = %self.path, lines = lines.len(), "read text source");
        Ok(lines)
    }
}

impl RddBase for TextFileRdd {
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        TransformKind::TextSource
    }

    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    fn describe(&self) -> String {
        format!("{}[{}] at {}", self.kind(), self.id, self.path)
    }
}

impl Rdd<String> for TextFileRdd {
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<String>> {
        let index = split.index();
        if index >= self.num_partitions {
            return Err(RddError::InvalidPartition(index));
        }
        let lines: Arc<Vec<String>> =
            job.get_or_load(BlockKey::Source { rdd_id: self.id }, || self.load())?;
        Ok(lines[partition_range(lines.len(), self.num_partitions, index)].to_vec())
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}
