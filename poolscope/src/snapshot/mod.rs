//! Stack snapshot acquisition
//!
//! Spawns the external stack-dump pipeline and exposes its stdout as a
//! deadline-bounded line stream. The child process and its pipe are a scoped
//! acquisition: [`DumpStream`] kills and reaps the child when dropped, on
//! every exit path including parse failures.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, warn};
use std::io::{self, BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::domain::DiagnosticError;

/// Default upper bound on spawning and fully reading the dump.
pub const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

const SHELL: &str = "/bin/sh";

/// Default shell pipeline: locate the target process by fuzzy name match and
/// dump every thread stack to stdout.
#[must_use]
pub fn default_dump_pipeline(process_match: &str) -> String {
    format!("jps -l|awk '/{process_match}/{{print $1}}'| xargs jstack")
}

/// Invokes the external stack-dump command and yields its output stream.
#[derive(Debug, Clone)]
pub struct SnapshotCollector {
    command: String,
    timeout: Duration,
    shell: &'static str,
}

impl SnapshotCollector {
    /// Collector for the default dump pipeline targeting processes whose
    /// name matches `process_match`.
    #[must_use]
    pub fn for_process(process_match: &str) -> Self {
        Self::with_command(default_dump_pipeline(process_match))
    }

    /// Collector running an explicit shell command. The command must emit
    /// the dump line format (`at ` frames, blank-line record separators).
    #[must_use]
    pub fn with_command(command: impl Into<String>) -> Self {
        Self { command: command.into(), timeout: DEFAULT_SNAPSHOT_TIMEOUT, shell: SHELL }
    }

    /// Replace the read deadline (default [`DEFAULT_SNAPSHOT_TIMEOUT`]).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_shell(mut self, shell: &'static str) -> Self {
        self.shell = shell;
        self
    }

    /// Spawn the dump command and open its output stream.
    ///
    /// # Errors
    /// - [`DiagnosticError::UnsupportedEnvironment`] on non-POSIX platforms
    /// - [`DiagnosticError::SnapshotUnavailable`] if the process cannot be
    ///   started or its stdout cannot be opened
    pub fn collect(&self) -> Result<DumpStream, DiagnosticError> {
        ensure_supported()?;
        debug!("capturing stack snapshot: {}", self.command);

        let mut child = Command::new(self.shell)
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                DiagnosticError::SnapshotUnavailable(format!(
                    "failed to start `{}`: {e}",
                    self.command
                ))
            })?;

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(DiagnosticError::SnapshotUnavailable(
                "dump process has no stdout pipe".to_string(),
            ));
        };

        // Pump lines off the pipe on a dedicated thread so the consumer can
        // enforce an overall deadline with recv_deadline.
        let (tx, rx) = crossbeam_channel::unbounded();
        let reader = std::thread::Builder::new()
            .name("poolscope-dump-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| {
                reap(&mut child);
                DiagnosticError::SnapshotUnavailable(format!("failed to spawn reader thread: {e}"))
            })?;

        Ok(DumpStream {
            child,
            rx,
            reader: Some(reader),
            deadline: Instant::now() + self.timeout,
            timed_out: false,
        })
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Fail on platforms without the required external tooling.
///
/// # Errors
/// [`DiagnosticError::UnsupportedEnvironment`] on non-POSIX platforms.
pub fn ensure_supported() -> Result<(), DiagnosticError> {
    if cfg!(unix) {
        Ok(())
    } else {
        Err(DiagnosticError::UnsupportedEnvironment)
    }
}

/// Line stream over a live dump process.
///
/// Yields `io::Result<String>` lines; a deadline overrun yields a single
/// `TimedOut` error and then ends the stream. Dropping the stream kills and
/// reaps the child process.
#[derive(Debug)]
pub struct DumpStream {
    child: Child,
    rx: Receiver<io::Result<String>>,
    reader: Option<JoinHandle<()>>,
    deadline: Instant,
    timed_out: bool,
}

impl Iterator for DumpStream {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.timed_out {
            return None;
        }
        match self.rx.recv_deadline(self.deadline) {
            Ok(line) => Some(line),
            // Reader thread finished: pipe closed, dump complete
            Err(RecvTimeoutError::Disconnected) => None,
            Err(RecvTimeoutError::Timeout) => {
                self.timed_out = true;
                warn!("stack dump did not complete before the deadline");
                Some(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "stack dump did not complete before the deadline",
                )))
            }
        }
    }
}

impl Drop for DumpStream {
    fn drop(&mut self) {
        // Kill first so the reader thread sees EOF and exits
        reap(&mut self.child);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
