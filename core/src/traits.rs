//! Core traits for the Sparklet engine
//!
//! This module defines the fundamental abstractions for RDDs (Resilient Distributed Datasets):
//! the lineage node traits, partitions, dependencies and the error taxonomy surfaced by actions.

use crate::scheduler::JobContext;
use crate::shuffle::ShuffleDependencyBase;
use serde::{Deserialize, Serialize};
use sparklet_common::CommonError;
use std::fmt::{self, Debug};
use std::sync::Arc;
use thiserror::Error;

/// Identifier of an RDD within its context.
pub type RddId = usize;
/// Identifier of a shuffle within its context.
pub type ShuffleId = usize;
/// Identifier of a job (one action invocation).
pub type JobId = u64;

/// The kind of lineage step that produced an RDD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    TextSource,
    Parallelize,
    Map,
    Filter,
    FlatMap,
    Union,
    ReduceByKey,
    CombineByKey,
    GroupByKey,
    Repartition,
    /// Driver-side fold performed by the `reduce` action.
    Reduce,
}

impl TransformKind {
    /// Returns true for kinds that require a shuffle.
    pub fn is_wide(&self) -> bool {
        matches!(
            self,
            Self::ReduceByKey | Self::CombineByKey | Self::GroupByKey | Self::Repartition
        )
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TextSource => "textSource",
            Self::Parallelize => "parallelize",
            Self::Map => "map",
            Self::Filter => "filter",
            Self::FlatMap => "flatMap",
            Self::Union => "union",
            Self::ReduceByKey => "reduceByKey",
            Self::CombineByKey => "combineByKey",
            Self::GroupByKey => "groupByKey",
            Self::Repartition => "repartition",
            Self::Reduce => "reduce",
        };
        f.write_str(name)
    }
}

/// Error types for RDD operations
#[derive(Error, Debug)]
pub enum RddError {
    #[error("Source not found: {path}")]
    SourceNotFound { path: String },

    #[error("Transformation {kind} (rdd {rdd_id}) failed on partition {partition}: {source}")]
    Transformation {
        rdd_id: RddId,
        kind: TransformKind,
        partition: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid partitioning: {0}")]
    Partitioning(String),

    #[error("Invalid partition: {0}")]
    InvalidPartition(usize),

    #[error(transparent)]
    Storage(#[from] CommonError),

    #[error("Job {job_id} was cancelled")]
    Cancelled { job_id: JobId },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RddError {
    /// Partition index the failure is attributed to, if any.
    pub fn partition(&self) -> Option<usize> {
        match self {
            Self::Transformation { partition, .. } => Some(*partition),
            Self::InvalidPartition(index) => Some(*index),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for RDD operations
pub type RddResult<T> = Result<T, RddError>;

/// Partition represents a logical partition of data in an RDD
pub trait Partition: Send + Sync + Debug {
    /// Get the partition index
    fn index(&self) -> usize;

    /// Get a unique identifier for this partition
    fn id(&self) -> String {
        format!("partition_{}", self.index())
    }
}

/// Basic partition implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicPartition {
    index: usize,
}

impl BasicPartition {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Partition for BasicPartition {
    fn index(&self) -> usize {
        self.index
    }
}

/// A data type that can be used in an RDD.
pub trait Data:
    Send + Sync + Clone + Debug + Serialize + for<'de> Deserialize<'de> + 'static
{
}
impl<T> Data for T where
    T: Send + Sync + Clone + Debug + Serialize + for<'de> Deserialize<'de> + 'static
{
}

/// Base trait for all RDDs, containing non-generic methods.
///
/// The scheduler walks lineage through this trait without knowing record types.
pub trait RddBase: Send + Sync + Debug {
    /// Get a unique ID for this RDD.
    fn id(&self) -> RddId;

    /// The lineage step that produced this RDD.
    fn kind(&self) -> TransformKind;

    /// Get the number of partitions
    fn num_partitions(&self) -> usize;

    /// Get dependencies of this RDD (for lineage tracking)
    fn dependencies(&self) -> Vec<Dependency>;

    /// One-line description used by lineage listings.
    fn describe(&self) -> String {
        format!("{}[{}]", self.kind(), self.id())
    }
}

/// Core RDD trait that computes the records of one partition.
pub trait Rdd<T: Data>: RddBase {
    /// Compute the elements of this RDD for the given partition.
    ///
    /// Parents must be read through [`JobContext::materialize`] so that a
    /// partition shared by several children is computed once per job.
    fn compute(&self, split: &dyn Partition, job: &JobContext) -> RddResult<Vec<T>>;

    /// View this node as its untyped lineage base.
    fn as_rdd_base(self: Arc<Self>) -> Arc<dyn RddBase>;
}

/// Represents a dependency of an RDD on its parent(s).
#[derive(Clone)]
pub enum Dependency {
    /// Each partition of the child depends on a single partition of the parent.
    Narrow(Arc<dyn RddBase>),
    /// Partitions of the child depend on every partition of the parent.
    Shuffle(Arc<dyn ShuffleDependencyBase>),
}

impl Dependency {
    /// The parent RDD on the other side of this dependency.
    pub fn rdd(&self) -> Arc<dyn RddBase> {
        match self {
            Self::Narrow(rdd) => rdd.clone(),
            Self::Shuffle(dep) => dep.parent(),
        }
    }

    pub fn is_shuffle(&self) -> bool {
        matches!(self, Self::Shuffle(_))
    }
}

impl Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narrow(rdd) => f.debug_tuple("Narrow").field(&rdd.id()).finish(),
            Self::Shuffle(dep) => f
                .debug_struct("Shuffle")
                .field("shuffle_id", &dep.shuffle_id())
                .field("parent", &dep.parent().id())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_partition() {
        let p = BasicPartition::new(3);
        assert_eq!(p.index(), 3);
        assert_eq!(p.id(), "partition_3");
    }

    #[test]
    fn test_transform_kind_display() {
        assert_eq!(TransformKind::FlatMap.to_string(), "flatMap");
        assert_eq!(TransformKind::ReduceByKey.to_string(), "reduceByKey");
        assert!(TransformKind::GroupByKey.is_wide());
        assert!(!TransformKind::Union.is_wide());
    }

    #[test]
    fn test_error_partition_attribution() {
        let err = RddError::Transformation {
            rdd_id: 7,
            kind: TransformKind::Map,
            partition: 2,
            source: anyhow::anyhow!("bad record"),
        };
        assert_eq!(err.partition(), Some(2));
        assert_eq!(
            err.to_string(),
            "Transformation map (rdd 7) failed on partition 2: bad record"
        );
        assert!(RddError::Cancelled { job_id: 1 }.is_cancelled());
    }
}
