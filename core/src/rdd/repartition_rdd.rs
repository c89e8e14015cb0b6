//! RDD that redistributes records across a new number of partitions using a shuffle.

use crate::scheduler::JobContext;
use crate::shuffle::{MapOutputBlock, ShuffleDependencyBase};
use crate::traits::{
    Data, Dependency, Partition, Rdd, RddBase, RddError, RddId, RddResult, ShuffleId,
    TransformKind,
};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Map side of a repartition.
///
/// Record `j` of map partition `m` goes to reduce partition `(m + j) % n`,
/// so consecutive map partitions start filling from different targets.
pub struct RepartitionDependency<T: Data> {
    shuffle_id: ShuffleId,
    parent: Arc<dyn Rdd<T>>,
    num_partitions: usize,
}

impl<T: Data> RepartitionDependency<T> {
    pub fn new(shuffle_id: ShuffleId, parent: Arc<dyn Rdd<T>>, num_partitions: usize) -> Self {
        Self {
            shuffle_id,
            parent,
            num_partitions,
        }
    }

    fn map_outputs(&self, job: &JobContext) -> RddResult<Vec<Arc<Vec<Vec<T>>>>> {
        job.shuffle_output(self.shuffle_id)?
            .iter()
            .map(|block| {
                block.clone().downcast::<Vec<Vec<T>>>().map_err(|_| {
                    RddError::Internal(format!(
                        "map output of shuffle {} has an unexpected type",
                        self.shuffle_id
                    ))
                })
            })
            .collect()
    }
}

impl<T: Data> Debug for RepartitionDependency<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepartitionDependency")
            .field("shuffle_id", &self.shuffle_id)
            .field("parent", &self.parent.id())
            .field("num_partitions", &self.num_partitions)
            .finish()
    }
}

impl<T: Data> ShuffleDependencyBase for RepartitionDependency<T> {
    fn shuffle_id(&self) -> ShuffleId {
        self.shuffle_id
    }

    fn parent(&self) -> Arc<dyn RddBase> {
        self.parent.clone().as_rdd_base()
    }

    fn num_reduce_partitions(&self) -> usize {
        self.num_partitions
    }

    fn run_map_task(&self, split: &dyn Partition, job: &JobContext) -> RddResult<MapOutputBlock> {
        let n = self.num_partitions;
        if n == 0 {
            return Err(RddError::Partitioning(
                "repartition requests zero partitions".to_string(),
            ));
        }
        let records = job.materialize(self.parent.as_ref(), split)?;
        let mut buckets: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
        for (j, record) in records.iter().enumerate() {
            buckets[(split.index() + j) % n].push(record.clone());
        }
        Ok(Arc::new(buckets))
    }
}

/// Reduce side of a repartition.
pub struct RepartitionedRdd<T: Data> {
    id: RddId,
    dep: Arc<RepartitionDependency<T>>,
}

impl<T: Data> RepartitionedRdd<T> {
    pub fn new(id: RddId, dep: Arc<RepartitionDependency<T>>) -> Self {
        Self { id, dep }
    }
}

impl<T: Data> Debug for RepartitionedRdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepartitionedRdd")
            .field("id", &self.id)
            .field("dependency", &self.dep)
            .finish()
    }
}

impl<T: Data> RddBase for RepartitionedRdd<T> {
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Repartition
    }

    fn num_partitions(&self) -> usize {
        self.dep.num_partitions
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::Shuffle(self.dep.clone())]
    }
}

impl<T: Data> Rdd<T> for RepartitionedRdd<T> {
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<T>> {
        let index = split.index();
        if index >= self.num_partitions() {
            return Err(RddError::InvalidPartition(index));
        }
        Ok(self
            .dep
            .map_outputs(job)?
            .iter()
            .filter_map(|output| output.get(index))
            .flat_map(|bucket| bucket.iter().cloned())
            .collect())
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdd::ParallelCollectionRdd;
    use crate::traits::BasicPartition;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_round_robin_buckets() {
        let parent: Arc<dyn Rdd<i32>> =
            Arc::new(ParallelCollectionRdd::new(0, (0..6).collect::<Vec<i32>>(), 2));
        let dep = Arc::new(RepartitionDependency::new(0, parent, 3));
        let job = JobContext::new(0, CancellationToken::new());

        let outputs = (0..2)
            .map(|m| dep.run_map_task(&BasicPartition::new(m), &job).unwrap())
            .collect();
        job.put_shuffle_output(0, outputs);

        let rdd = RepartitionedRdd::new(1, dep);
        // map 0 holds [0, 1, 2], map 1 holds [3, 4, 5]
        assert_eq!(rdd.compute(&BasicPartition::new(0), &job).unwrap(), vec![0, 5]);
        assert_eq!(rdd.compute(&BasicPartition::new(1), &job).unwrap(), vec![1, 3]);
        assert_eq!(rdd.compute(&BasicPartition::new(2), &job).unwrap(), vec![2, 4]);
    }
}
