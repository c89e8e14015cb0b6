//! RDD (Resilient Distributed Dataset) implementations
//!
//! This module contains the lineage nodes, the driver-facing
//! [`DistributedRdd`] handle and the key-based transformations.

pub mod distributed;
pub mod mapped_rdd;
pub mod repartition_rdd;
pub mod shuffled_rdd;
pub mod source_rdd;
pub mod transformations;
pub mod union_rdd;
pub(crate) mod user_fn;

pub use distributed::*;
pub use mapped_rdd::*;
pub use repartition_rdd::*;
pub use shuffled_rdd::*;
pub use source_rdd::*;
pub use transformations::*;
pub use union_rdd::*;
