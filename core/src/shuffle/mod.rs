//! Core components for shuffle operations.

pub mod aggregator;
pub mod dependency;
pub mod partitioner;

pub use aggregator::*;
pub use dependency::*;
pub use partitioner::*;
