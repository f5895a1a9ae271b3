//! RDD (Resilient Distributed Dataset) implementations
//!
//! This module contains the core RDD implementations and operations
//! for the Tally engine.

pub mod actions;
pub mod base;
pub mod shuffled_rdd;
pub mod transformations;

pub use base::*;
pub use shuffled_rdd::*;
pub use transformations::*;
