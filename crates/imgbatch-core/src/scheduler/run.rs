use futures::future::join_all;
use std::time::Duration;

use super::plan::{batch_ranges, resolve_start, StartPoint};
use super::progress::{RunEvent, RunSummary};
use super::BatchScheduler;
use crate::discovery::DiscoverySet;
use crate::profile::RunConfig;
use crate::progress_db::ProgressRecord;
use crate::retry::{attempt, ItemReport, RetryPolicy};
use crate::transfer::Fetch;

impl<F: Fetch> BatchScheduler<F> {
    /// Decide the start index for `total` items, discarding a checkpoint that
    /// belongs to a different discovery set.
    pub async fn start_index(&self, total: usize, resume_accepted: bool) -> usize {
        let record = match self.store.load(&self.key).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(key = %self.key, "could not read checkpoint, starting fresh: {:#}", e);
                None
            }
        };
        match resolve_start(record.as_ref(), total, resume_accepted) {
            StartPoint::Fresh => {
                if record.is_some() {
                    tracing::info!(key = %self.key, "checkpoint present but not resumed, starting at 0");
                }
                0
            }
            StartPoint::Resume(index) => {
                tracing::info!(key = %self.key, index, total, "resuming from checkpoint");
                index
            }
            StartPoint::Mismatch { stored_total } => {
                tracing::warn!(
                    key = %self.key,
                    stored_total,
                    total,
                    "checkpoint is for a different item set, discarding"
                );
                if let Err(e) = self.store.clear(&self.key).await {
                    tracing::warn!(key = %self.key, "failed to discard checkpoint: {:#}", e);
                }
                0
            }
        }
    }

    /// Process `items` from the resolved start index to the end, one batch at a time.
    ///
    /// Per-item failures never abort the run; they are counted in the summary.
    /// The checkpoint advances to each batch end regardless of item outcomes and
    /// is removed once every item has reached a terminal outcome.
    pub async fn run(
        &self,
        items: &DiscoverySet,
        cfg: &RunConfig,
        resume_accepted: bool,
    ) -> RunSummary {
        let cfg = cfg.sanitized();
        let total = items.len();
        let start = self.start_index(total, resume_accepted).await;
        let batches = batch_ranges(start, total, cfg.batch_size);
        let policy = RetryPolicy::from_run_config(&cfg);
        let mut summary = RunSummary::new(total, start);

        tracing::info!(
            total,
            start,
            batches = batches.len(),
            batch_size = cfg.batch_size,
            "run starting"
        );
        self.emit(RunEvent::Started {
            total,
            start_index: start,
            batches: batches.len(),
        })
        .await;

        let batch_count = batches.len();
        for (n, range) in batches.into_iter().enumerate() {
            self.emit(RunEvent::BatchStarted {
                number: n + 1,
                batches: batch_count,
                range: range.clone(),
            })
            .await;
            tracing::debug!(batch = n + 1, start = range.start, end = range.end, "batch starting");

            let launches = range.clone().enumerate().map(|(offset, index)| {
                let policy = &policy;
                let stagger = stagger_delay(cfg.per_item_delay(), offset);
                async move {
                    if !stagger.is_zero() {
                        tokio::time::sleep(stagger).await;
                    }
                    let id = &items.as_slice()[index];
                    let report = attempt(index, id, &self.transfer, policy).await;
                    self.emit(RunEvent::ItemFinished(report.clone())).await;
                    report
                }
            });
            let reports: Vec<ItemReport> = join_all(launches).await;
            for report in &reports {
                summary.record(report);
            }

            self.checkpoint(range.end, total).await;

            if n + 1 < batch_count && !cfg.batch_interval().is_zero() {
                self.emit(RunEvent::CoolingDown(cfg.batch_interval())).await;
                tracing::debug!(ms = cfg.batch_interval_ms, "cooling down between batches");
                tokio::time::sleep(cfg.batch_interval()).await;
            }
        }

        if summary.covers_all() {
            match self.store.clear(&self.key).await {
                Ok(_) => summary.checkpoint_cleared = true,
                Err(e) => tracing::warn!(key = %self.key, "failed to clear checkpoint: {:#}", e),
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            rate_limited = summary.rate_limited,
            "run finished"
        );
        summary
    }

    async fn checkpoint(&self, last_completed_index: usize, total: usize) {
        let record = ProgressRecord::new(last_completed_index, total);
        match self.store.save(&self.key, &record).await {
            Ok(()) => {
                tracing::debug!(last_completed_index, total, "checkpoint saved");
                self.emit(RunEvent::CheckpointSaved {
                    last_completed_index,
                    total,
                })
                .await;
            }
            Err(e) => tracing::warn!(
                key = %self.key,
                last_completed_index,
                "failed to save checkpoint: {:#}",
                e
            ),
        }
    }
}

/// Delay before launching the item at `offset` within its batch.
fn stagger_delay(per_item: Duration, offset: usize) -> Duration {
    per_item.saturating_mul(u32::try_from(offset).unwrap_or(u32::MAX))
}
