//! Stack-dump parsing
//!
//! Turns the line-oriented text produced by the external dump command into
//! discrete per-worker stack records. Only threads whose header line contains
//! the target pool's worker-name substring are emitted; everything else in
//! the dump belongs to unrelated threads and is skipped.
//!
//! Dump line format (as produced by `jstack`-style tools):
//! - a header line naming the thread, e.g. `"order-pool-3" #12 ... runnable`
//! - frame lines starting (after leading whitespace) with `at `
//! - a blank line terminating each thread's stack

use std::io::{self, BufRead};

/// Marker that opens a call-stack frame line, after leading whitespace.
pub const FRAME_MARKER: &str = "at ";

/// One worker thread's stack as found in the raw dump.
///
/// `top_frame` holds the first frame line encountered after the header
/// (trimmed), or `None` if the record ended before any frame line appeared.
/// Frame-less records are excluded from hang aggregation but still belong in
/// the persisted detail text.
#[derive(Debug, Clone)]
pub struct WorkerStackRecord {
    /// The thread's identifying header line, verbatim.
    pub header: String,
    /// All lines between the header and the blank-line terminator, verbatim.
    pub frames: Vec<String>,
    /// First `at `-marked line after the header, trimmed.
    pub top_frame: Option<String>,
}

impl WorkerStackRecord {
    /// Full original stack text: the header followed by every retained line.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.header.as_str()).chain(self.frames.iter().map(String::as_str))
    }
}

/// Streaming parser over dump lines.
///
/// A lazy, finite, non-restartable iterator: records are built as lines are
/// pulled from the underlying stream, and the stream is consumed exactly
/// once. Errors from the underlying stream are passed through and end the
/// record in progress.
///
/// The parser is a two-state machine: scanning for a header line containing
/// the worker name, then accumulating frame lines until a whitespace-only
/// terminator (or end of stream) closes the record.
pub struct DumpParser<I> {
    lines: I,
    worker_name: String,
}

impl<I> DumpParser<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(worker_name: impl Into<String>, lines: I) -> Self {
        Self { lines, worker_name: worker_name.into() }
    }
}

impl DumpParser<io::Lines<io::BufReader<std::fs::File>>> {
    /// Parse a dump previously saved to a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn from_file(
        worker_name: impl Into<String>,
        path: impl AsRef<std::path::Path>,
    ) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(worker_name, io::BufReader::new(file).lines()))
    }
}

impl<I> Iterator for DumpParser<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = io::Result<WorkerStackRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        // ScanningForHeader
        let header = loop {
            match self.lines.next()? {
                Err(e) => return Some(Err(e)),
                Ok(line) if line.contains(&self.worker_name) => break line,
                Ok(_) => {}
            }
        };

        // InsideStack
        let mut record = WorkerStackRecord { header, frames: Vec::new(), top_frame: None };
        loop {
            match self.lines.next() {
                // End of stream closes the final record
                None => return Some(Ok(record)),
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        return Some(Ok(record));
                    }
                    if record.top_frame.is_none() && line.trim_start().starts_with(FRAME_MARKER) {
                        record.top_frame = Some(line.trim().to_string());
                    }
                    record.frames.push(line);
                }
            }
        }
    }
}
