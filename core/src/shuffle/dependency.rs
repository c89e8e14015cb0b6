//! Defines shuffle dependencies between RDDs.
//!
//! A shuffle dependency owns the map side of a shuffle: it computes one
//! parent partition, pre-combines its records per key and splits the result
//! into one bucket per reduce partition. The scheduler runs every map task of
//! a dependency before any reduce partition is computed.

use crate::rdd::user_fn::run_user_fn;
use crate::scheduler::JobContext;
use crate::shuffle::{Aggregator, Partitioner, combine_in_order};
use crate::traits::{Data, Partition, Rdd, RddBase, RddError, RddId, RddResult, ShuffleId, TransformKind};
use std::any::Any;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

/// Type-erased output of one map task.
pub type MapOutputBlock = Arc<dyn Any + Send + Sync>;

/// Buckets of pre-combined pairs, indexed by reduce partition.
pub type MapOutput<K, C> = Vec<Vec<(K, C)>>;

/// Object-safe view of a shuffle used by the scheduler.
pub trait ShuffleDependencyBase: Send + Sync {
    fn shuffle_id(&self) -> ShuffleId;

    /// The RDD whose partitions feed the map side.
    fn parent(&self) -> Arc<dyn RddBase>;

    fn num_map_partitions(&self) -> usize {
        self.parent().num_partitions()
    }

    fn num_reduce_partitions(&self) -> usize;

    /// Compute one map partition and bucket it by destination partition.
    fn run_map_task(&self, split: &dyn Partition, job: &JobContext) -> RddResult<MapOutputBlock>;
}

/// Represents a dependency on the output of a shuffle stage.
pub struct ShuffleDependency<K: Data, V: Data, C: Data> {
    pub shuffle_id: ShuffleId,
    /// The shuffled RDD consuming this dependency, for error attribution.
    pub rdd_id: RddId,
    pub kind: TransformKind,
    pub rdd: Arc<dyn Rdd<(K, V)>>,
    pub aggregator: Arc<dyn Aggregator<V, C>>,
    pub partitioner: Arc<dyn Partitioner<K>>,
}

impl<K: Data, V: Data, C: Data> ShuffleDependency<K, V, C> {
    pub fn new(
        shuffle_id: ShuffleId,
        rdd_id: RddId,
        kind: TransformKind,
        rdd: Arc<dyn Rdd<(K, V)>>,
        aggregator: Arc<dyn Aggregator<V, C>>,
        partitioner: Arc<dyn Partitioner<K>>,
    ) -> Self {
        Self {
            shuffle_id,
            rdd_id,
            kind,
            rdd,
            aggregator,
            partitioner,
        }
    }

    /// Fetch the map outputs of this shuffle for the current job.
    pub(crate) fn map_outputs(&self, job: &JobContext) -> RddResult<Vec<Arc<MapOutput<K, C>>>> {
        job.shuffle_output(self.shuffle_id)?
            .iter()
            .map(|block| {
                block.clone().downcast::<MapOutput<K, C>>().map_err(|_| {
                    RddError::Internal(format!(
                        "map output of shuffle {} has an unexpected type",
                        self.shuffle_id
                    ))
                })
            })
            .collect()
    }
}

impl<K: Data, V: Data, C: Data> Debug for ShuffleDependency<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShuffleDependency")
            .field("shuffle_id", &self.shuffle_id)
            .field("parent", &self.rdd.id())
            .field("aggregator", &self.aggregator)
            .field("partitioner", &self.partitioner)
            .finish()
    }
}

impl<K, V, C> ShuffleDependencyBase for ShuffleDependency<K, V, C>
where
    K: Data + Hash + Eq,
    V: Data,
    C: Data,
{
    fn shuffle_id(&self) -> ShuffleId {
        self.shuffle_id
    }

    fn parent(&self) -> Arc<dyn RddBase> {
        self.rdd.clone().as_rdd_base()
    }

    fn num_reduce_partitions(&self) -> usize {
        self.partitioner.num_partitions()
    }

    fn run_map_task(&self, split: &dyn Partition, job: &JobContext) -> RddResult<MapOutputBlock> {
        let records = job.materialize(self.rdd.as_ref(), split)?;
        let num_buckets = self.partitioner.num_partitions();

        let buckets: MapOutput<K, C> = run_user_fn(self.rdd_id, self.kind, split.index(), || {
            let aggregator = &self.aggregator;
            let combined = combine_in_order(
                records.iter().cloned(),
                |v| aggregator.create_combiner(v),
                |c, v| aggregator.merge_value(c, v),
            );

            let mut buckets: MapOutput<K, C> = (0..num_buckets).map(|_| Vec::new()).collect();
            for (key, combiner) in combined {
                let target = self.partitioner.get_partition(&key);
                buckets[target].push((key, combiner));
            }
            Ok(buckets)
        })?;

        Ok(Arc::new(buckets))
    }
}
