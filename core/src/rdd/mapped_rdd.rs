//! Narrow, record-at-a-time transformations: map, filter and flat_map.
//!
//! Each node materializes the matching parent partition through the job
//! context and applies its function to the records in order. User functions
//! are stored in their fallible form; the infallible API wraps them.

use crate::rdd::user_fn::run_user_fn;
use crate::scheduler::JobContext;
use crate::traits::{Data, Dependency, Partition, Rdd, RddBase, RddId, RddResult, TransformKind};
use std::fmt::{self, Debug};
use std::sync::Arc;

pub type MapFn<T, U> = Arc<dyn Fn(T) -> anyhow::Result<U> + Send + Sync>;
pub type PredicateFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<bool> + Send + Sync>;
pub type FlatMapFn<T, U> = Arc<dyn Fn(T) -> anyhow::Result<Vec<U>> + Send + Sync>;

/// Applies a function to every record.
pub struct MappedRdd<T: Data, U: Data> {
    id: RddId,
    parent: Arc<dyn Rdd<T>>,
    func: MapFn<T, U>,
}

impl<T: Data, U: Data> MappedRdd<T, U> {
    pub fn new(id: RddId, parent: Arc<dyn Rdd<T>>, func: MapFn<T, U>) -> Self {
        Self { id, parent, func }
    }
}

impl<T: Data, U: Data> Debug for MappedRdd<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRdd")
            .field("id", &self.id)
            .field("parent", &self.parent.id())
            .field("func", &"<map_function>")
            .finish()
    }
}

impl<T: Data, U: Data> RddBase for MappedRdd<T, U> {
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Map
    }

    fn num_partitions(&self) -> usize {
        self.parent.num_partitions()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::Narrow(self.parent.clone().as_rdd_base())]
    }
}

impl<T: Data, U: Data> Rdd<U> for MappedRdd<T, U> {
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<U>> {
        let input = job.materialize(self.parent.as_ref(), split)?;
        run_user_fn(self.id, self.kind(), split.index(), || {
            input.iter().cloned().map(|record| (self.func)(record)).collect()
        })
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}

/// Keeps the records matching a predicate.
pub struct FilteredRdd<T: Data> {
    id: RddId,
    parent: Arc<dyn Rdd<T>>,
    predicate: PredicateFn<T>,
}

impl<T: Data> FilteredRdd<T> {
    pub fn new(id: RddId, parent: Arc<dyn Rdd<T>>, predicate: PredicateFn<T>) -> Self {
        Self {
            id,
            parent,
            predicate,
        }
    }
}

impl<T: Data> Debug for FilteredRdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredRdd")
            .field("id", &self.id)
            .field("parent", &self.parent.id())
            .field("predicate", &"<filter_predicate>")
            .finish()
    }
}

impl<T: Data> RddBase for FilteredRdd<T> {
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Filter
    }

    fn num_partitions(&self) -> usize {
        self.parent.num_partitions()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::Narrow(self.parent.clone().as_rdd_base())]
    }
}

impl<T: Data> Rdd<T> for FilteredRdd<T> {
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<T>> {
        let input = job.materialize(self.parent.as_ref(), split)?;
        run_user_fn(self.id, self.kind(), split.index(), || {
            let mut kept = Vec::new();
            for record in input.iter() {
                if (self.predicate)(record)? {
                    kept.push(record.clone());
                }
            }
            Ok(kept)
        })
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}

/// Expands every record into zero or more records, keeping record order.
pub struct FlatMappedRdd<T: Data, U: Data> {
    id: RddId,
    parent: Arc<dyn Rdd<T>>,
    func: FlatMapFn<T, U>,
}

impl<T: Data, U: Data> FlatMappedRdd<T, U> {
    pub fn new(id: RddId, parent: Arc<dyn Rdd<T>>, func: FlatMapFn<T, U>) -> Self {
        Self { id, parent, func }
    }
}

impl<T: Data, U: Data> Debug for FlatMappedRdd<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatMappedRdd")
            .field("id", &self.id)
            .field("parent", &self.parent.id())
            .field("func", &"<flat_map_function>")
            .finish()
    }
}

impl<T: Data, U: Data> RddBase for FlatMappedRdd<T, U> {
    fn id(&self) -> RddId {
        self.id
    }

    fn kind(&self) -> TransformKind {
        TransformKind::FlatMap
    }

    fn num_partitions(&self) -> usize {
        self.parent.num_partitions()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::Narrow(self.parent.clone().as_rdd_base())]
    }
}

impl<T: Data, U: Data> Rdd<U> for FlatMappedRdd<T, U> {
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<U>> {
        let input = job.materialize(self.parent.as_ref(), split)?;
        run_user_fn(self.id, self.kind(), split.index(), || {
            let mut output = Vec::new();
            for record in input.iter().cloned() {
                output.extend((self.func)(record)?);
            }
            Ok(output)
        })
    }

    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase> {
        self
    }
}
