//! Batch scheduler.
//!
//! Walks the discovery set in fixed-size batches. Items within a batch run
//! concurrently (launches staggered), batches run strictly one after another,
//! and a checkpoint is written at every batch boundary so an interrupted run
//! can resume where the last full batch ended.

mod plan;
mod progress;
mod run;

pub use plan::{batch_ranges, resolve_start, StartPoint};
pub use progress::{RunEvent, RunSummary};

use tokio::sync::mpsc;

use crate::progress_db::ProgressDb;
use crate::transfer::{Fetch, Transfer};

/// Everything one run needs: checkpoint store, its key, and the transfer executor.
pub struct BatchScheduler<F> {
    store: ProgressDb,
    key: String,
    transfer: Transfer<F>,
    events: Option<mpsc::Sender<RunEvent>>,
}

impl<F: Fetch> BatchScheduler<F> {
    pub fn new(store: ProgressDb, key: impl Into<String>, transfer: Transfer<F>) -> Self {
        Self {
            store,
            key: key.into(),
            transfer,
            events: None,
        }
    }

    /// Send progress events to `tx` during `run`.
    pub fn with_events(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening; the run goes on.
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests;
