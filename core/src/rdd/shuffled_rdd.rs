//! RDD that represents the reduce side of a keyed shuffle.

use crate::rdd::user_fn::run_user_fn;
use crate::scheduler::JobContext;
use crate::shuffle::{ShuffleDependency, combine_in_order};
use crate::traits::{
    Data, Dependency, Partition, Rdd, RddBase, RddError, RddId, RddResult, TransformKind,
};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

/// ShuffledRdd is an RDD that has a shuffle dependency on its parent.
/// It is the result of operations like `reduce_by_key` and `group_by_key`.
///
/// K: Key type
/// V: Value type of the parent RDD
/// C: Combiner type (output value type)
pub struct ShuffledRdd<K: Data, V: Data, C: Data> {
    id: RddId,
    dep: Arc<ShuffleDependency<K, V, C>>,
}

impl<K: Data, V: Data, C: Data> ShuffledRdd<K, V, C> {
    /// `dep.rdd_id` must be `id`: map-side failures are attributed to this RDD.
    pub fn new(id: RddId, dep: Arc<ShuffleDependency<K, V, C>>) -> Self {
        Self { id, dep }
    }
}

impl<K: Data, V: Data, C: Data> Debug for ShuffledRdd<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShuffledRdd")
            .field("id", &self.id)
            .field("kind", &self.dep.kind)
            .field("dependency", &self.dep)
            .finish()
    }
}

impl<K, V, C> RddBase for ShuffledRdd<K, V, C>
where
    K: Data + Hash + Eq,
    V: Data,
    C: Data,
{
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        self.dep.kind
    }

    fn num_partitions(&self) -> usize {
        self.dep.partitioner.num_partitions()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::Shuffle(self.dep.clone())]
    }
}

impl<K, V, C> Rdd<(K, C)> for ShuffledRdd<K, V, C>
where
    K: Data + Hash + Eq,
    V: Data,
    C: Data,
{
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<(K, C)>> {
        let index = split.index();
        if index >= self.num_partitions() {
            return Err(RddError::InvalidPartition(index));
        }
        let outputs = self.dep.map_outputs(job)?;
        let aggregator = &self.dep.aggregator;

        // Map outputs are merged in map-partition order.
        run_user_fn(self.id, self.kind(), index, || {
            let partials = outputs
                .iter()
                .filter_map(|output| output.get(index))
                .flat_map(|bucket| bucket.iter().cloned());
            Ok(combine_in_order(
                partials,
                |c| c,
                |acc, c| aggregator.merge_combiners(acc, c),
            ))
        })
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}
