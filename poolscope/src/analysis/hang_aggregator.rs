//! Hang-point aggregation and ranking.
//!
//! Each matched worker record is reduced to its current top frame; distinct
//! top frames are tallied and ranked by occurrence count. Ranking is an
//! explicit stable sort over the tally, never a sorted associative container
//! keyed by count: that would collapse distinct frames that happen to share
//! a count.

use serde::Serialize;
use std::collections::HashMap;

use crate::dump::WorkerStackRecord;

/// A distinct top-of-stack frame and how many workers are currently on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HangPoint {
    /// The frame text, e.g. `at java.net.PlainSocketImpl.socketConnect(Native Method)`.
    pub frame: String,
    /// Number of matched workers whose top frame is this one.
    pub count: usize,
}

/// Streaming tally of top frames across worker records.
///
/// Records without a top frame (the worker had no frame lines before its
/// terminator) are ignored here; they still appear in the detail artifact.
#[derive(Debug, Default)]
pub struct HangAggregator {
    tallies: HashMap<String, usize>,
    hanging: usize,
}

impl HangAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally one worker record's top frame.
    pub fn record(&mut self, record: &WorkerStackRecord) {
        if let Some(frame) = &record.top_frame {
            *self.tallies.entry(frame.clone()).or_insert(0) += 1;
            self.hanging += 1;
        }
    }

    /// Number of records tallied so far. Counts sum to this value.
    #[must_use]
    pub fn hanging_workers(&self) -> usize {
        self.hanging
    }

    /// Consume the tally and rank it: count descending, then frame text
    /// ascending. Equal-count frames are all retained.
    #[must_use]
    pub fn into_ranked(self) -> Vec<HangPoint> {
        let mut ranked: Vec<HangPoint> = self
            .tallies
            .into_iter()
            .map(|(frame, count)| HangPoint { frame, count })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.frame.cmp(&b.frame)));
        ranked
    }
}
