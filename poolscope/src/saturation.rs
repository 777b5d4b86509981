//! Saturation handling
//!
//! The orchestrator fired on the rejecting submitter's thread when a pool
//! turns work away: capture a stack snapshot, parse out the pool's worker
//! records, rank their hang points, persist the detail artifact, and raise
//! the composed summary as a [`DiagnosticError::PoolSaturated`].
//!
//! Handler invocations may race when several submitters are rejected at
//! once. Each event spawns its own dump process, but events for the same
//! pool share a detail path, so the write phase is serialized through a
//! process-wide registry of per-pool-name locks.

use log::info;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::analysis::HangAggregator;
use crate::domain::{DiagnosticError, PoolStats};
use crate::dump::DumpParser;
use crate::report::{compose_summary, DumpSummary, ReportWriter};
use crate::snapshot::SnapshotCollector;

static ARTIFACT_LOCKS: OnceLock<Mutex<HashMap<String, Arc<Mutex<()>>>>> = OnceLock::new();

/// Lock guarding the detail artifact of one pool name.
fn artifact_lock(pool_name: &str) -> Arc<Mutex<()>> {
    let registry = ARTIFACT_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut locks = registry.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(pool_name.to_string()).or_default())
}

/// Run the parse → aggregate → persist pipeline over a dump line stream.
///
/// Single pass: each matched record is tallied and appended to the detail
/// artifact as it is parsed. A stream or parse failure surfaces immediately
/// as [`DiagnosticError::SnapshotUnavailable`] and takes precedence over any
/// artifact I/O failure; artifact failures are deferred until aggregation
/// has completed and then surface as [`DiagnosticError::ReportIo`].
///
/// # Errors
/// `SnapshotUnavailable` on stream errors (including the read deadline),
/// `ReportIo` on artifact write failures.
pub fn capture_hang_report<I>(
    lines: I,
    worker_name: &str,
    writer: &ReportWriter,
) -> Result<DumpSummary, DiagnosticError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut aggregator = HangAggregator::new();
    let mut sink = writer.open_detail(worker_name);
    let mut matched = 0usize;

    for record in DumpParser::new(worker_name, lines) {
        let record = record
            .map_err(|e| DiagnosticError::SnapshotUnavailable(format!("reading dump: {e}")))?;
        matched += 1;
        aggregator.record(&record);
        sink.append_record(&record);
    }

    let hanging = aggregator.hanging_workers();
    let detail_path = sink.finish()?;
    info!("{matched} worker threads matched \"{worker_name}\", {hanging} with live frames");

    Ok(DumpSummary {
        worker_match: worker_name.to_string(),
        matched_workers: matched,
        hanging_workers: hanging,
        hang_points: aggregator.into_ranked(),
        detail_path,
    })
}

/// Rejection callback wired into a pool: runs the full diagnosis and always
/// produces an error to raise back to the submitter.
#[derive(Debug, Clone)]
pub struct SaturationHandler {
    pool_name: String,
    collector: SnapshotCollector,
    writer: ReportWriter,
}

impl SaturationHandler {
    /// Handler for `pool_name`, dumping the process matching `process_match`
    /// with the default pipeline and writing the artifact to the default
    /// detail directory.
    #[must_use]
    pub fn new(pool_name: impl Into<String>, process_match: &str) -> Self {
        Self {
            pool_name: pool_name.into(),
            collector: SnapshotCollector::for_process(process_match),
            writer: ReportWriter::new(),
        }
    }

    /// Replace the snapshot collector (custom dump command or timeout).
    #[must_use]
    pub fn with_collector(mut self, collector: SnapshotCollector) -> Self {
        self.collector = collector;
        self
    }

    /// Replace the report writer (custom detail directory).
    #[must_use]
    pub fn with_report_writer(mut self, writer: ReportWriter) -> Self {
        self.writer = writer;
        self
    }

    #[must_use]
    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    /// Diagnose a saturation event observed with `stats`.
    ///
    /// Always returns an error value for the submitter: `PoolSaturated`
    /// carrying the composed summary when the diagnosis succeeds, or the
    /// failing stage's error otherwise. The saturation event is never
    /// silently swallowed.
    pub fn handle(&self, stats: &PoolStats) -> DiagnosticError {
        info!("pool \"{}\" saturated, capturing stack snapshot", self.pool_name);
        match self.diagnose(stats) {
            Ok(summary) => DiagnosticError::PoolSaturated(summary),
            Err(e) => e,
        }
    }

    fn diagnose(&self, stats: &PoolStats) -> Result<String, DiagnosticError> {
        let stream = self.collector.collect()?;

        // Serialize the write phase per pool name; the snapshot itself is
        // per-event and runs outside the lock.
        let lock = artifact_lock(&self.pool_name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let summary = capture_hang_report(stream, &self.pool_name, &self.writer)?;
        Ok(compose_summary(&self.pool_name, stats, &summary.hang_points, &summary.detail_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> PoolStats {
        PoolStats {
            pool_size: 2,
            active_count: 2,
            core_size: 2,
            max_size: 2,
            largest_size: 2,
            task_count: 3,
            completed_count: 1,
            is_shutdown: false,
            is_terminated: false,
            is_terminating: false,
        }
    }

    fn fake_dump_command() -> &'static str {
        "printf '\"order-pool-1\" #12 runnable\\n\\tat x.X.x(X.java:1)\\n\\n\"order-pool-2\" #13 runnable\\n\\tat x.X.x(X.java:1)\\n\\n'"
    }

    #[test]
    fn test_successful_diagnosis_raises_pool_saturated() {
        let dir = tempfile::tempdir().unwrap();
        let handler = SaturationHandler::new("order-pool", "ignored")
            .with_collector(SnapshotCollector::with_command(fake_dump_command()))
            .with_report_writer(ReportWriter::with_detail_dir(dir.path()));

        match handler.handle(&sample_stats()) {
            DiagnosticError::PoolSaturated(msg) => {
                assert!(msg.starts_with("Thread pool is EXHAUSTED! Thread Name: order-pool,"));
                assert!(msg.contains("2 threads are hanging on this code : at x.X.x(X.java:1)"));
                assert!(msg.contains("order-pool.detail"));
            }
            other => panic!("expected PoolSaturated, got {other:?}"),
        }
        assert!(dir.path().join("order-pool.detail").exists());
    }

    #[test]
    fn test_snapshot_failure_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let handler = SaturationHandler::new("order-pool", "ignored")
            .with_collector(
                SnapshotCollector::with_command("true").with_shell("/nonexistent/poolscope-sh"),
            )
            .with_report_writer(ReportWriter::with_detail_dir(dir.path()));

        match handler.handle(&sample_stats()) {
            DiagnosticError::SnapshotUnavailable(_) => {}
            other => panic!("expected SnapshotUnavailable, got {other:?}"),
        }
        assert!(!dir.path().join("order-pool.detail").exists());
    }

    #[test]
    fn test_unwritable_detail_dir_raises_report_io() {
        let handler = SaturationHandler::new("order-pool", "ignored")
            .with_collector(SnapshotCollector::with_command(fake_dump_command()))
            .with_report_writer(ReportWriter::with_detail_dir("/nonexistent/poolscope-dir"));

        match handler.handle(&sample_stats()) {
            DiagnosticError::ReportIo { path, .. } => {
                assert!(path.ends_with("order-pool.detail"));
            }
            other => panic!("expected ReportIo, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_events_on_one_pool_both_complete() {
        let dir = tempfile::tempdir().unwrap();
        let handler = SaturationHandler::new("busy-pool", "ignored")
            .with_collector(SnapshotCollector::with_command(
                "printf '\"busy-pool-1\" runnable\\n\\tat z.Z.z(Z.java:9)\\n\\n'",
            ))
            .with_report_writer(ReportWriter::with_detail_dir(dir.path()));

        let results: Vec<DiagnosticError> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let handler = handler.clone();
                    scope.spawn(move || handler.handle(&sample_stats()))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in results {
            assert!(matches!(result, DiagnosticError::PoolSaturated(_)));
        }
        let text = std::fs::read_to_string(dir.path().join("busy-pool.detail")).unwrap();
        assert_eq!(text, "\"busy-pool-1\" runnable\n\tat z.Z.z(Z.java:9)\n\n");
    }
}
