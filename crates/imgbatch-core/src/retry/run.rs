//! Retry loop: run one item's transfer until success or the policy says stop.

use std::future::Future;
use std::path::PathBuf;

use super::classify::classify;
use super::error::{TransferError, ValidationError};
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::discovery::ResourceId;
use crate::transfer::{Fetch, Transfer};

/// Why an item was not attempted over the network.
#[derive(Debug, Clone)]
pub enum SkipReason {
    Invalid(ValidationError),
    AlreadyPresent(PathBuf),
}

/// Terminal result for one item.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    /// Saved; carries the number of bytes written.
    Success(u64),
    Skipped(SkipReason),
    /// Gave up; carries the error of the last attempt.
    Failed(TransferError),
}

impl From<TransferError> for ItemOutcome {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Invalid(v) => ItemOutcome::Skipped(SkipReason::Invalid(v)),
            TransferError::AlreadyPresent(p) => ItemOutcome::Skipped(SkipReason::AlreadyPresent(p)),
            other => ItemOutcome::Failed(other),
        }
    }
}

/// Result of `run_with_retry`: the outcome plus attempt accounting.
#[derive(Debug, Clone)]
pub struct Attempted {
    pub outcome: ItemOutcome,
    /// Number of times the operation was invoked.
    pub attempts: u32,
    /// How many of those attempts were answered with 429.
    pub rate_limited: u32,
}

/// Per-item report handed back to the scheduler.
#[derive(Debug, Clone)]
pub struct ItemReport {
    /// Position of the item in the discovery set.
    pub index: usize,
    pub id: ResourceId,
    pub outcome: ItemOutcome,
    pub attempts: u32,
    pub rate_limited: u32,
}

/// Runs `f` until it succeeds or the retry policy says to stop.
/// On a retryable failure, sleeps for the backoff duration then tries again.
/// `f` receives the 1-based attempt number.
pub async fn run_with_retry<F, Fut>(policy: &RetryPolicy, url: &str, mut f: F) -> Attempted
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<u64, TransferError>>,
{
    if policy.max_attempts == 0 {
        return Attempted {
            outcome: ItemOutcome::Failed(TransferError::NoAttempts),
            attempts: 0,
            rate_limited: 0,
        };
    }

    let mut rate_limited = 0u32;
    let mut attempt = 1u32;
    loop {
        match f(attempt).await {
            Ok(bytes) => {
                return Attempted {
                    outcome: ItemOutcome::Success(bytes),
                    attempts: attempt,
                    rate_limited,
                };
            }
            Err(e) => {
                let kind = classify(&e);
                match kind {
                    ErrorKind::Throttled => {
                        rate_limited += 1;
                        tracing::warn!(url, attempt, "rate limited (HTTP 429)");
                    }
                    ErrorKind::Skip => {}
                    _ => tracing::warn!(url, attempt, error = %e, "attempt failed"),
                }
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return Attempted {
                            outcome: e.into(),
                            attempts: attempt,
                            rate_limited,
                        };
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(
                            url,
                            next_attempt = attempt + 1,
                            delay_ms = d.as_millis() as u64,
                            "backing off"
                        );
                        tokio::time::sleep(d).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

/// Full per-item pipeline: validate and name the destination (no network),
/// then fetch and save under the retry policy.
pub async fn attempt<F: Fetch>(
    index: usize,
    id: &ResourceId,
    executor: &Transfer<F>,
    policy: &RetryPolicy,
) -> ItemReport {
    let prepared = match executor.prepare(index, id) {
        Ok(p) => p,
        Err(e) => {
            match &e {
                TransferError::AlreadyPresent(path) => {
                    tracing::info!(index, path = %path.display(), "already present, skipping")
                }
                _ => tracing::warn!(index, url = id.as_str(), error = %e, "skipping item"),
            }
            return ItemReport {
                index,
                id: id.clone(),
                outcome: e.into(),
                attempts: 0,
                rate_limited: 0,
            };
        }
    };

    let attempted =
        run_with_retry(policy, id.as_str(), |_| executor.fetch_and_save(&prepared)).await;

    match &attempted.outcome {
        ItemOutcome::Success(bytes) => {
            tracing::debug!(index, url = id.as_str(), bytes, attempts = attempted.attempts, "saved")
        }
        ItemOutcome::Failed(e) => tracing::error!(
            index,
            url = id.as_str(),
            attempts = attempted.attempts,
            error = %e,
            "item failed"
        ),
        ItemOutcome::Skipped(_) => {}
    }

    ItemReport {
        index,
        id: id.clone(),
        outcome: attempted.outcome,
        attempts: attempted.attempts,
        rate_limited: attempted.rate_limited,
    }
}
