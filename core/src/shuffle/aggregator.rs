//! Defines the Aggregator trait for combining values in shuffle operations.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Aggregator trait for combining values for a key.
/// Used in operations like `reduce_by_key` and `combine_by_key`.
///
/// V: Input value type
/// C: Combiner (intermediate/output) type
///
/// `merge_value` and `merge_combiners` are applied in an unspecified order
/// on both sides of the shuffle. They must be associative and commutative;
/// other functions give undefined results.
pub trait Aggregator<V, C>: Send + Sync + Debug {
    /// Create a combiner from the first value for a key.
    fn create_combiner(&self, v: V) -> C;

    /// Merge a new value into an existing combiner.
    fn merge_value(&self, c: C, v: V) -> C;

    /// Merge two combiners.
    fn merge_combiners(&self, c1: C, c2: C) -> C;
}

/// Reduction function shared between the map and reduce side of a shuffle.
pub type ReduceFn<V> = Arc<dyn Fn(V, V) -> V + Send + Sync>;

/// A simple aggregator for reduceByKey operations where the combiner type is the same as the value type
#[derive(Clone)]
pub struct ReduceAggregator<V> {
    reduce_func: ReduceFn<V>,
}

impl<V> ReduceAggregator<V> {
    pub fn new<F>(reduce_func: F) -> Self
    where
        F: Fn(V, V) -> V + Send + Sync + 'static,
    {
        Self {
            reduce_func: Arc::new(reduce_func),
        }
    }
}

impl<V> Debug for ReduceAggregator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReduceAggregator")
            .field("reduce_func", &"<function>")
            .finish()
    }
}

impl<V> Aggregator<V, V> for ReduceAggregator<V>
where
    V: Send + Sync + 'static,
{
    fn create_combiner(&self, v: V) -> V {
        v
    }

    fn merge_value(&self, c: V, v: V) -> V {
        (self.reduce_func)(c, v)
    }

    fn merge_combiners(&self, c1: V, c2: V) -> V {
        (self.reduce_func)(c1, c2)
    }
}

/// Collects every value of a key, in encounter order.
pub struct GroupByKeyAggregator<V>(PhantomData<fn(V)>);

impl<V> GroupByKeyAggregator<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for GroupByKeyAggregator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for GroupByKeyAggregator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GroupByKeyAggregator")
    }
}

impl<V: Send + Sync + 'static> Aggregator<V, Vec<V>> for GroupByKeyAggregator<V> {
    fn create_combiner(&self, v: V) -> Vec<V> {
        vec![v]
    }

    fn merge_value(&self, mut c: Vec<V>, v: V) -> Vec<V> {
        c.push(v);
        c
    }

    fn merge_combiners(&self, mut c1: Vec<V>, mut c2: Vec<V>) -> Vec<V> {
        c1.append(&mut c2);
        c1
    }
}

/// Count aggregator that counts the number of values per key
pub struct CountAggregator<V>(PhantomData<fn(V)>);

impl<V> CountAggregator<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for CountAggregator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for CountAggregator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CountAggregator")
    }
}

impl<V: Send + Sync + 'static> Aggregator<V, u64> for CountAggregator<V> {
    fn create_combiner(&self, _v: V) -> u64 {
        1
    }

    fn merge_value(&self, c: u64, _v: V) -> u64 {
        c + 1
    }

    fn merge_combiners(&self, c1: u64, c2: u64) -> u64 {
        c1 + c2
    }
}

/// Folds `(key, item)` pairs into one combiner per key.
///
/// Keys are emitted in the order they were first seen.
pub(crate) fn combine_in_order<K, X, C>(
    items: impl IntoIterator<Item = (K, X)>,
    create: impl Fn(X) -> C,
    merge: impl Fn(C, X) -> C,
) -> Vec<(K, C)>
where
    K: Hash + Eq + Clone,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut combined: Vec<(K, Option<C>)> = Vec::new();

    for (key, item) in items {
        match index.get(&key) {
            Some(&slot) => {
                let entry = &mut combined[slot].1;
                *entry = entry.take().map(|c| merge(c, item));
            }
            None => {
                index.insert(key.clone(), combined.len());
                combined.push((key, Some(create(item))));
            }
        }
    }

    combined
        .into_iter()
        .filter_map(|(key, c)| c.map(|c| (key, c)))
        .collect()
}
