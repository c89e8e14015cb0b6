//! Sparklet Core - a lazy, partitioned dataset engine
//!
//! This is the core crate of the Sparklet project. It provides lazily
//! evaluated RDDs built from in-memory collections or text in a block store,
//! narrow and shuffle transformations over them, and a local scheduler that
//! evaluates partitions in parallel when an action is called.

pub mod context;
pub mod rdd;
pub mod scheduler;
pub mod shuffle;
pub mod traits;

pub use context::{ContextConfig, FlowContext};
pub use rdd::{DistributedRdd, PairRddExt};
pub use scheduler::JobSummary;
pub use shuffle::{Aggregator, CountAggregator, GroupByKeyAggregator, ReduceAggregator};
pub use traits::{RddError, RddResult, TransformKind};
