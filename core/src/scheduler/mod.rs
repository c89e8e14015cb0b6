//! Task Scheduler module
//!
//! This module plans jobs over RDD lineage and executes their tasks
//! in parallel using Rayon's thread pool.

pub mod dag_scheduler;
pub mod job_context;
pub mod local_scheduler;

pub use dag_scheduler::*;
pub use job_context::JobContext;
pub use local_scheduler::*;
