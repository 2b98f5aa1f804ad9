//! Where a run starts and how the remaining items split into batches.

use std::ops::Range;

use crate::progress_db::ProgressRecord;

/// Start point derived from the stored checkpoint and the operator's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPoint {
    /// No usable checkpoint, or the operator chose to restart.
    Fresh,
    /// Continue at this index (the stored `lastCompletedIndex`).
    Resume(usize),
    /// A checkpoint exists for a different discovery set; it must be discarded.
    Mismatch { stored_total: usize },
}

/// Resume only when accepted, the record is non-trivial, and it was written for
/// a discovery set of the same size.
pub fn resolve_start(
    record: Option<&ProgressRecord>,
    total: usize,
    resume_accepted: bool,
) -> StartPoint {
    let Some(record) = record else {
        return StartPoint::Fresh;
    };
    if record.total != total {
        return StartPoint::Mismatch {
            stored_total: record.total,
        };
    }
    if !resume_accepted || record.last_completed_index == 0 {
        return StartPoint::Fresh;
    }
    StartPoint::Resume(record.last_completed_index.min(total))
}

/// Contiguous, ordered batches covering `start..total`; every batch but the
/// last has exactly `batch_size` items.
pub fn batch_ranges(start: usize, total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.max(1);
    (start..total)
        .step_by(size)
        .map(|lo| lo..(lo + size).min(total))
        .collect()
}
