//! The driver-facing handle over a lineage node.
//!
//! Transformations only build lineage and return a new handle; nothing runs
//! until one of the actions at the bottom of this file is called.

use crate::context::FlowContext;
use crate::rdd::mapped_rdd::{FilteredRdd, FlatMappedRdd, MappedRdd};
use crate::rdd::repartition_rdd::{RepartitionDependency, RepartitionedRdd};
use crate::rdd::union_rdd::UnionRdd;
use crate::rdd::user_fn::run_user_fn;
use crate::traits::{Data, Rdd, RddBase, RddId, RddResult, TransformKind};
use std::fmt::{self, Debug, Display, Write};
use std::sync::Arc;
use tracing::info;

/// A Resilient Distributed Dataset handle bound to the context that created it.
pub struct DistributedRdd<T: Data> {
    rdd: Arc<dyn Rdd<T>>,
    context: FlowContext,
}

impl<T: Data> Clone for DistributedRdd<T> {
    fn clone(&self) -> Self {
        Self {
            rdd: self.rdd.clone(),
            context: self.context.clone(),
        }
    }
}

impl<T: Data> Debug for DistributedRdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedRdd")
            .field("id", &self.rdd.id())
            .field("kind", &self.rdd.kind())
            .field("num_partitions", &self.rdd.num_partitions())
            .finish()
    }
}

impl<T: Data> DistributedRdd<T> {
    pub fn new(rdd: Arc<dyn Rdd<T>>, context: FlowContext) -> Self {
        Self { rdd, context }
    }

    pub fn id(&self) -> RddId {
        self.rdd.id()
    }

    pub fn kind(&self) -> TransformKind {
        self.rdd.kind()
    }

    pub fn num_partitions(&self) -> usize {
        self.rdd.num_partitions()
    }

    pub fn rdd(&self) -> &Arc<dyn Rdd<T>> {
        &self.rdd
    }

    pub fn context(&self) -> &FlowContext {
        &self.context
    }

    fn derive<U: Data>(&self, rdd: Arc<dyn Rdd<U>>) -> DistributedRdd<U> {
        DistributedRdd::new(rdd, self.context.clone())
    }

    /// Apply a map transformation to this RDD
    pub fn map<U, F>(&self, f: F) -> DistributedRdd<U>
    where
        U: Data,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_map(move |record| Ok(f(record)))
    }

    /// Like [`map`](Self::map), for functions that can fail.
    pub fn try_map<U, F>(&self, f: F) -> DistributedRdd<U>
    where
        U: Data,
        F: Fn(T) -> anyhow::Result<U> + Send + Sync + 'static,
    {
        let rdd = MappedRdd::new(self.context.new_rdd_id(), self.rdd.clone(), Arc::new(f));
        self.derive(Arc::new(rdd))
    }

    /// Apply a filter transformation to this RDD
    pub fn filter<F>(&self, predicate: F) -> DistributedRdd<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.try_filter(move |record| Ok(predicate(record)))
    }

    pub fn try_filter<F>(&self, predicate: F) -> DistributedRdd<T>
    where
        F: Fn(&T) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        let rdd = FilteredRdd::new(
            self.context.new_rdd_id(),
            self.rdd.clone(),
            Arc::new(predicate),
        );
        self.derive(Arc::new(rdd))
    }

    /// Apply `f` to every record and flatten the results within each partition.
    pub fn flat_map<U, I, F>(&self, f: F) -> DistributedRdd<U>
    where
        U: Data,
        I: IntoIterator<Item = U>,
        F: Fn(T) -> I + Send + Sync + 'static,
    {
        self.try_flat_map(move |record| Ok(f(record)))
    }

    pub fn try_flat_map<U, I, F>(&self, f: F) -> DistributedRdd<U>
    where
        U: Data,
        I: IntoIterator<Item = U>,
        F: Fn(T) -> anyhow::Result<I> + Send + Sync + 'static,
    {
        let func = move |record: T| -> anyhow::Result<Vec<U>> {
            Ok(f(record)?.into_iter().collect())
        };
        let rdd = FlatMappedRdd::new(self.context.new_rdd_id(), self.rdd.clone(), Arc::new(func));
        self.derive(Arc::new(rdd))
    }

    /// Partitions of `self` followed by partitions of `other`.
    pub fn union(&self, other: &DistributedRdd<T>) -> DistributedRdd<T> {
        let rdd = UnionRdd::new(
            self.context.new_rdd_id(),
            self.rdd.clone(),
            other.rdd.clone(),
        );
        self.derive(Arc::new(rdd))
    }

    /// Pair every record with the key computed by `f`.
    pub fn key_by<K, F>(&self, f: F) -> DistributedRdd<(K, T)>
    where
        K: Data,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.map(move |record| (f(&record), record))
    }

    /// Redistribute the records round-robin over `num_partitions` partitions.
    pub fn repartition(&self, num_partitions: usize) -> DistributedRdd<T> {
        let dep = RepartitionDependency::new(
            self.context.new_shuffle_id(),
            self.rdd.clone(),
            num_partitions,
        );
        let rdd = RepartitionedRdd::new(self.context.new_rdd_id(), Arc::new(dep));
        self.derive(Arc::new(rdd))
    }

    /// Indented lineage listing, one node per line.
    ///
    /// Shuffle boundaries are marked with `+-`. A parent shared by several
    /// children is listed under each of them.
    pub fn to_debug_string(&self) -> String {
        let mut out = String::new();
        write_lineage(&self.rdd.clone().as_rdd_base(), 0, false, &mut out);
        out.truncate(out.trim_end().len());
        out
    }

    // Actions

    /// Return all records, concatenated in partition-index order.
    pub fn collect(&self) -> RddResult<Vec<T>> {
        self.context
            .dag_scheduler()
            .run_job(&self.rdd, "collect", |stage| stage.collect())
    }

    /// Count the records of every partition.
    pub fn count(&self) -> RddResult<usize> {
        self.context
            .dag_scheduler()
            .run_job(&self.rdd, "count", |stage| stage.count())
    }

    /// Return the first `n` records.
    ///
    /// Partitions are evaluated one at a time in index order, and evaluation
    /// stops once `n` records are available. The first partition is always
    /// evaluated, so `take(0)` reports the same errors as `take(1)`. Any
    /// failure fails the whole call.
    pub fn take(&self, n: usize) -> RddResult<Vec<T>> {
        self.context
            .dag_scheduler()
            .run_job(&self.rdd, "take", |stage| {
                let mut taken = Vec::with_capacity(n);
                for index in 0..stage.num_partitions() {
                    let records = stage.compute_partition(index)?;
                    let missing = n - taken.len();
                    taken.extend(records.iter().take(missing).cloned());
                    if taken.len() >= n {
                        break;
                    }
                }
                Ok(taken)
            })
    }

    pub fn first(&self) -> RddResult<Option<T>> {
        Ok(self.take(1)?.into_iter().next())
    }

    /// Fold all records with `f`; `None` when the RDD is empty.
    ///
    /// `f` must be associative and commutative.
    pub fn reduce<F>(&self, f: F) -> RddResult<Option<T>>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let rdd_id = self.id();
        self.context
            .dag_scheduler()
            .run_job(&self.rdd, "reduce", |stage| {
                let partials = stage.run({
                    let f = f.clone();
                    move |index, records| {
                        run_user_fn(rdd_id, TransformKind::Reduce, index, || {
                            Ok(records.iter().cloned().reduce(|a, b| f(a, b)))
                        })
                    }
                })?;

                let mut result: Option<T> = None;
                for (index, partial) in partials.into_iter().enumerate() {
                    let Some(partial) = partial else { continue };
                    result = Some(match result {
                        None => partial,
                        Some(acc) => run_user_fn(rdd_id, TransformKind::Reduce, index, || {
                            Ok(f(acc, partial))
                        })?,
                    });
                }
                Ok(result)
            })
    }

    /// Write the `Display` form of every record, one per line in partition
    /// order, to `path` in the context's block store.
    pub fn save_as_text_file(&self, path: &str) -> RddResult<()>
    where
        T: Display,
    {
        let lines = self
            .context
            .dag_scheduler()
            .run_job(&self.rdd, "saveAsTextFile", |stage| {
                let per_partition = stage.run(|_, records| {
                    Ok(records.iter().map(ToString::to_string).collect::<Vec<_>>())
                })?;
                Ok(per_partition.concat())
            })?;

        self.context.store().write(path, &lines)?;
        info!(rdd_id = self.id(), path, lines = lines.len(), "saved text file");
        Ok(())
    }
}

impl<K: Data, V: Data> DistributedRdd<(K, V)> {
    /// Apply `f` to every value, keeping keys and partitioning.
    pub fn map_values<W, F>(&self, f: F) -> DistributedRdd<(K, W)>
    where
        W: Data,
        F: Fn(V) -> W + Send + Sync + 'static,
    {
        self.map(move |(k, v)| (k, f(v)))
    }

    pub fn keys(&self) -> DistributedRdd<K> {
        self.map(|(k, _)| k)
    }

    pub fn values(&self) -> DistributedRdd<V> {
        self.map(|(_, v)| v)
    }
}

fn write_lineage(rdd: &Arc<dyn RddBase>, depth: usize, shuffle: bool, out: &mut String) {
    let marker = if shuffle { "+-" } else { "" };
    let _ = writeln!(
        out,
        "{}{}({}) {}",
        "  ".repeat(depth),
        marker,
        rdd.num_partitions(),
        rdd.describe()
    );
    for dep in rdd.dependencies() {
        write_lineage(&dep.rdd(), depth + 1, dep.is_shuffle(), out);
    }
}
