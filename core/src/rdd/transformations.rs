//! Key-based transformations for RDDs of pairs.

use crate::rdd::{DistributedRdd, ShuffledRdd};
use crate::shuffle::{
    Aggregator, GroupByKeyAggregator, HashPartitioner, ReduceAggregator, ShuffleDependency,
};
use crate::traits::{Data, TransformKind};
use std::hash::Hash;
use std::sync::Arc;

/// An extension trait for RDDs of key-value pairs.
///
/// Every operation here is a wide transformation: evaluating the result
/// runs a shuffle with a map-side combine.
pub trait PairRddExt<K: Data, V: Data> {
    /// Merge the values of each key with `reduce_func`, keeping the
    /// partition count of the parent.
    ///
    /// `reduce_func` must be associative and commutative; it is applied in
    /// an unspecified order on both sides of the shuffle.
    fn reduce_by_key<F>(&self, reduce_func: F) -> DistributedRdd<(K, V)>
    where
        F: Fn(V, V) -> V + Send + Sync + 'static;

    /// Like [`reduce_by_key`](Self::reduce_by_key) with `num_partitions` output partitions.
    fn reduce_by_key_with_partitions<F>(
        &self,
        reduce_func: F,
        num_partitions: usize,
    ) -> DistributedRdd<(K, V)>
    where
        F: Fn(V, V) -> V + Send + Sync + 'static;

    /// Combine values with the same key using a custom aggregator.
    fn combine_by_key<C: Data>(
        &self,
        aggregator: Arc<dyn Aggregator<V, C>>,
        num_partitions: usize,
    ) -> DistributedRdd<(K, C)>;

    /// Groups all values for a key into a single sequence.
    fn group_by_key(&self) -> DistributedRdd<(K, Vec<V>)>;
}

impl<K, V> PairRddExt<K, V> for DistributedRdd<(K, V)>
where
    K: Data + Hash + Eq,
    V: Data,
{
    fn reduce_by_key<F>(&self, reduce_func: F) -> DistributedRdd<(K, V)>
    where
        F: Fn(V, V) -> V + Send + Sync + 'static,
    {
        self.reduce_by_key_with_partitions(reduce_func, self.num_partitions())
    }

    fn reduce_by_key_with_partitions<F>(
        &self,
        reduce_func: F,
        num_partitions: usize,
    ) -> DistributedRdd<(K, V)>
    where
        F: Fn(V, V) -> V + Send + Sync + 'static,
    {
        shuffle(
            self,
            TransformKind::ReduceByKey,
            Arc::new(ReduceAggregator::<V>::new(reduce_func)),
            num_partitions,
        )
    }

    fn combine_by_key<C: Data>(
        &self,
        aggregator: Arc<dyn Aggregator<V, C>>,
        num_partitions: usize,
    ) -> DistributedRdd<(K, C)> {
        shuffle(self, TransformKind::CombineByKey, aggregator, num_partitions)
    }

    fn group_by_key(&self) -> DistributedRdd<(K, Vec<V>)> {
        shuffle(
            self,
            TransformKind::GroupByKey,
            Arc::new(GroupByKeyAggregator::<V>::new()),
            self.num_partitions(),
        )
    }
}

fn shuffle<K, V, C>(
    parent: &DistributedRdd<(K, V)>,
    kind: TransformKind,
    aggregator: Arc<dyn Aggregator<V, C>>,
    num_partitions: usize,
) -> DistributedRdd<(K, C)>
where
    K: Data + Hash + Eq,
    V: Data,
    C: Data,
{
    let context = parent.context();
    let id = context.new_rdd_id();
    let dep = ShuffleDependency::new(
        context.new_shuffle_id(),
        id,
        kind,
        parent.rdd().clone(),
        aggregator,
        Arc::new(HashPartitioner::new(num_partitions)),
    );
    DistributedRdd::new(Arc::new(ShuffledRdd::new(id, Arc::new(dep))), context.clone())
}
