//! Structured error types for poolscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the saturation-diagnosis pipeline.
///
/// `PoolSaturated` is the expected outcome of a successful diagnosis: its
/// message is the full ranked summary. Every other variant means a pipeline
/// stage failed before the summary could be composed; the saturation event
/// is still surfaced to the submitter through that variant.
#[derive(Error, Debug)]
pub enum DiagnosticError {
    #[error("Stack snapshots are not supported on this platform (a POSIX shell is required)")]
    UnsupportedEnvironment,

    #[error("Stack snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    #[error("Failed to write detail file {path}: {source}")]
    ReportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    PoolSaturated(String),
}

/// Errors returned to a submitter whose task was not accepted.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Pool \"{0}\" is shut down")]
    Shutdown(String),

    #[error(transparent)]
    Rejected(#[from] DiagnosticError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_unavailable_display() {
        let err = DiagnosticError::SnapshotUnavailable("jstack exited early".to_string());
        assert_eq!(err.to_string(), "Stack snapshot unavailable: jstack exited early");
    }

    #[test]
    fn test_pool_saturated_carries_summary_verbatim() {
        let err = DiagnosticError::PoolSaturated("Thread pool is EXHAUSTED! ...".to_string());
        assert_eq!(err.to_string(), "Thread pool is EXHAUSTED! ...");
    }

    #[test]
    fn test_report_io_names_the_path() {
        let err = DiagnosticError::ReportIo {
            path: PathBuf::from("/home/u/order-pool.detail"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/home/u/order-pool.detail"));
    }

    #[test]
    fn test_submit_error_passes_diagnostic_through() {
        let err = SubmitError::from(DiagnosticError::UnsupportedEnvironment);
        assert!(err.to_string().contains("not supported"));
    }
}
