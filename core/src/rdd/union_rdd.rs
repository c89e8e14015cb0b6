//! Union of two RDDs with the same record type.

use crate::scheduler::JobContext;
use crate::traits::{
    BasicPartition, Data, Dependency, Partition, Rdd, RddBase, RddError, RddId, RddResult,
    TransformKind,
};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Partitions of `left` followed by partitions of `right`.
///
/// Both sides may share lineage; the shared partitions are computed once
/// per job.
pub struct UnionRdd<T: Data> {
    id: RddId,
    left: Arc<dyn Rdd<T>>,
    right: Arc<dyn Rdd<T>>,
}

impl<T: Data> UnionRdd<T> {
    pub fn new(id: RddId, left: Arc<dyn Rdd<T>>, right: Arc<dyn Rdd<T>>) -> Self {
        Self { id, left, right }
    }
}

impl<T: Data> Debug for UnionRdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionRdd")
            .field("id", &self.id)
            .field("left", &self.left.id())
            .field("right", &self.right.id())
            .finish()
    }
}

impl<T: Data> RddBase for UnionRdd<T> {
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Union
    }

    fn num_partitions(&self) -> usize {
        self.left.num_partitions() + self.right.num_partitions()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![
            Dependency::Narrow(self.left.clone().as_rdd_base()),
            Dependency::Narrow(self.right.clone().as_rdd_base()),
        ]
    }
}

impl<T: Data> Rdd<T> for UnionRdd<T> {
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<T>> {
        let index = split.index();
        let left_partitions = self.left.num_partitions();
        let records = if index < left_partitions {
            job.materialize(self.left.as_ref(), split)?
        } else if index < self.num_partitions() {
            let shifted = BasicPartition::new(index - left_partitions);
            job.materialize(self.right.as_ref(), &shifted)?
        } else {
            return Err(RddError::InvalidPartition(index));
        };
        Ok(records.as_ref().clone())
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}
