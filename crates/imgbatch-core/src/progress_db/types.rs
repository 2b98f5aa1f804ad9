//! Types stored in the progress database.

use serde::{Deserialize, Serialize};

/// Durable checkpoint of the last fully processed batch boundary.
///
/// Serialized as `{"lastCompletedIndex": n, "total": n, "timestamp": ms}` so
/// records stay readable across runs of the same discovery set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Exclusive end of the processed prefix: items `[0, last_completed_index)` are done.
    pub last_completed_index: usize,
    /// Size of the discovery set the checkpoint belongs to.
    pub total: usize,
    /// Milliseconds since the Unix epoch when the checkpoint was written.
    pub timestamp: i64,
}

impl ProgressRecord {
    pub fn new(last_completed_index: usize, total: usize) -> Self {
        Self {
            last_completed_index,
            total,
            timestamp: super::db::unix_timestamp_ms(),
        }
    }

    /// True when the stored values are internally consistent.
    pub fn is_consistent(&self) -> bool {
        self.last_completed_index <= self.total
    }

    /// Time since the checkpoint was written (zero if the clock went backwards).
    pub fn age(&self) -> std::time::Duration {
        let ms = super::db::unix_timestamp_ms().saturating_sub(self.timestamp);
        std::time::Duration::from_millis(ms.max(0) as u64)
    }
}
