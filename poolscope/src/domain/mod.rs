//! Domain model for poolscope
//!
//! Core types shared across the pipeline plus structured errors.

pub mod errors;
pub mod types;

pub use types::{Pid, PoolStats};

pub use errors::{DiagnosticError, SubmitError};
