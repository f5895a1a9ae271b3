//! Common utilities and abstractions for the Tally project.
//!
//! This crate provides the error taxonomy shared by the engine and the jobs
//! built on top of it.

pub mod error;

pub use error::{CommonError, Diagnose, ErrorCategory, ErrorContext, ErrorSeverity, Result};
