//! Run events for the CLI and the end-of-run summary.

use std::ops::Range;
use std::time::Duration;

use crate::retry::{ItemOutcome, ItemReport};

/// Progress notifications sent while a run is in flight.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Resume point resolved; `batches` will run.
    Started {
        total: usize,
        start_index: usize,
        batches: usize,
    },
    /// Batch `number` (1-based) is launching.
    BatchStarted {
        number: usize,
        batches: usize,
        range: Range<usize>,
    },
    ItemFinished(ItemReport),
    /// Checkpoint persisted at a batch boundary.
    CheckpointSaved {
        last_completed_index: usize,
        total: usize,
    },
    /// Pausing before the next batch.
    CoolingDown(Duration),
}

/// Aggregate counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub start_index: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// 429 responses seen across all attempts.
    pub rate_limited: u32,
    pub bytes_written: u64,
    /// Set when the run covered every item and the checkpoint was removed.
    pub checkpoint_cleared: bool,
}

impl RunSummary {
    pub(super) fn new(total: usize, start_index: usize) -> Self {
        Self {
            total,
            start_index,
            ..Self::default()
        }
    }

    pub(super) fn record(&mut self, report: &ItemReport) {
        self.rate_limited += report.rate_limited;
        match &report.outcome {
            ItemOutcome::Success(bytes) => {
                self.succeeded += 1;
                self.bytes_written += bytes;
            }
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Items that reached a terminal outcome in this run.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// True when this run (together with the resumed prefix) covered every item.
    pub fn covers_all(&self) -> bool {
        self.start_index + self.processed() == self.total
    }
}
