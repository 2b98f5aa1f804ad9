//! Retry and backoff policy.
//!
//! This module encapsulates error classification (throttling, transport and
//! HTTP failures, validation, local storage) and exponential backoff decisions
//! so that the scheduler treats every item the same way.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::{TransferError, ValidationError};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{attempt, run_with_retry, Attempted, ItemOutcome, ItemReport, SkipReason};
