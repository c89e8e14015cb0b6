//! Context module for Sparklet
//!
//! This module provides the execution context and its configuration.

pub mod config;
pub mod flow_context;

pub use config::*;
pub use flow_context::*;
