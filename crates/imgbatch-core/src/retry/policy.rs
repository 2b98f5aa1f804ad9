use std::time::Duration;

use crate::profile::RunConfig;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (429).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Any other non-2xx HTTP status.
    Http(u16),
    /// Item is not eligible for download (bad id, already on disk).
    Skip,
    /// Local disk write failed.
    Storage,
    /// Any other transport error.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy: attempt `k` (1-based, k ≥ 2) waits
/// `base_delay * 2^(k-2)` after attempt `k-1` failed.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_run_config(cfg: &RunConfig) -> Self {
        Self {
            max_attempts: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.retry_base_delay_ms.max(1)),
        }
    }

    /// Backoff before the attempt that follows failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(exp)
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        match kind {
            ErrorKind::Skip | ErrorKind::Storage => RetryDecision::NoRetry,
            _ if attempt >= self.max_attempts => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http(_)
            | ErrorKind::Other => RetryDecision::RetryAfter(self.backoff(attempt)),
        }
    }
}
