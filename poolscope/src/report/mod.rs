//! Report assembly
//!
//! Persists the filtered per-worker stacks to the detail artifact and
//! composes the human-readable exhaustion summary. The artifact lives at a
//! deterministic path derived from the pool's configured name so that
//! operators can find it without reading the summary first.

use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::analysis::HangPoint;
use crate::domain::{DiagnosticError, PoolStats};
use crate::dump::WorkerStackRecord;

/// Directory the detail artifact is written to: the user's home directory,
/// or the system temp dir when `HOME` is unset.
#[must_use]
pub fn default_detail_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(std::env::temp_dir, PathBuf::from)
}

/// Writes detail artifacts and composes summaries.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    detail_dir: PathBuf,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportWriter {
    #[must_use]
    pub fn new() -> Self {
        Self { detail_dir: default_detail_dir() }
    }

    /// Write artifacts under `dir` instead of the home directory.
    #[must_use]
    pub fn with_detail_dir(dir: impl Into<PathBuf>) -> Self {
        Self { detail_dir: dir.into() }
    }

    /// Deterministic artifact path for a pool name.
    #[must_use]
    pub fn detail_path(&self, pool_name: &str) -> PathBuf {
        self.detail_dir.join(format!("{pool_name}.detail"))
    }

    /// Open the detail artifact for one saturation event, truncating any
    /// previous content. Creation failure is held inside the sink so that
    /// parsing and aggregation can still run to completion; see
    /// [`DetailSink::finish`].
    #[must_use]
    pub fn open_detail(&self, pool_name: &str) -> DetailSink {
        DetailSink::create(self.detail_path(pool_name))
    }
}

/// Sink for the full filtered stack text of one saturation event.
///
/// I/O failures are recorded on first occurrence and turn the sink into a
/// no-op; the stored error surfaces from [`DetailSink::finish`]. This keeps
/// artifact I/O from interrupting aggregation, and lets the caller give an
/// in-flight parse failure precedence over the write failure.
pub struct DetailSink {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    error: Option<DiagnosticError>,
}

impl DetailSink {
    fn create(path: PathBuf) -> Self {
        match File::create(&path) {
            Ok(file) => Self { path, out: Some(BufWriter::new(file)), error: None },
            Err(source) => {
                let error = DiagnosticError::ReportIo { path: path.clone(), source };
                Self { path, out: None, error: Some(error) }
            }
        }
    }

    /// Append one worker record's full stack text, followed by the blank
    /// separator line.
    pub fn append_record(&mut self, record: &WorkerStackRecord) {
        let Some(out) = self.out.as_mut() else { return };
        let result = record
            .lines()
            .try_for_each(|line| writeln!(out, "{line}"))
            .and_then(|()| writeln!(out));
        if let Err(source) = result {
            self.error = Some(DiagnosticError::ReportIo { path: self.path.clone(), source });
            self.out = None;
        }
    }

    /// Flush and close the artifact.
    ///
    /// # Errors
    /// The first I/O failure encountered during creation, appends, or flush,
    /// as [`DiagnosticError::ReportIo`].
    pub fn finish(mut self) -> Result<PathBuf, DiagnosticError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if let Some(mut out) = self.out.take() {
            out.flush()
                .map_err(|source| DiagnosticError::ReportIo { path: self.path.clone(), source })?;
        }
        info!("wrote stack detail to {}", self.path.display());
        Ok(self.path)
    }
}

/// Compose the exhaustion summary raised back to the rejecting submitter.
///
/// Line structure is stable for downstream consumers: the `EXHAUSTED!`
/// header with pool identity and stats, one line per ranked hang point, and
/// the detail-file trailer.
#[must_use]
pub fn compose_summary(
    pool_name: &str,
    stats: &PoolStats,
    ranked: &[HangPoint],
    detail_path: &Path,
) -> String {
    let mut msg = format!("Thread pool is EXHAUSTED! Thread Name: {pool_name}, {stats}\n");
    for point in ranked {
        msg.push_str(&format!(
            "{} threads are hanging on this code : {}\n",
            point.count, point.frame
        ));
    }
    msg.push_str(&format!(
        "You can fetch more thread statck information by the detail file : {}\n",
        detail_path.display()
    ));
    msg
}

/// Machine-readable result of one capture, for `--json` export.
#[derive(Debug, Serialize)]
pub struct DumpSummary {
    /// Worker-name substring the dump was filtered by.
    pub worker_match: String,
    /// Worker records found in the dump.
    pub matched_workers: usize,
    /// Matched records that had at least one frame line.
    pub hanging_workers: usize,
    /// Ranked hang points, highest count first.
    pub hang_points: Vec<HangPoint>,
    /// Where the full stack text was persisted.
    pub detail_path: PathBuf,
}
