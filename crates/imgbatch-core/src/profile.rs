//! Run pacing presets.
//!
//! A `RunConfig` is chosen once per run from the number of discovered items
//! and the operator's profile, then stays fixed for the whole run. Larger
//! galleries get smaller batches and longer cool-downs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RetryConfig;

/// Items above this count use the slowest automatic preset.
const VERY_LARGE_THRESHOLD: usize = 999;
/// Items at or above this count use the medium preset.
const MEDIUM_THRESHOLD: usize = 333;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 5129;

/// Operator-selected pacing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Pick a preset from the item count.
    #[default]
    Normal,
    /// Small batches and long pauses.
    Cautious,
    /// No inter-batch pause; most likely to hit rate limits.
    Fast,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Normal => "normal",
            Profile::Cautious => "cautious",
            Profile::Fast => "fast",
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Profile::Normal),
            "cautious" => Ok(Profile::Cautious),
            "fast" | "ultrafast" => Ok(Profile::Fast),
            other => Err(format!("unknown profile: {other}")),
        }
    }
}

/// Immutable pacing and retry parameters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Items per batch; also the bound on concurrent transfers. Always ≥ 1.
    pub batch_size: usize,
    /// Pause between batches (not after the last one).
    pub batch_interval_ms: u64,
    /// Stagger between consecutive transfer launches within a batch.
    pub per_item_delay_ms: u64,
    /// Total attempts per item, including the first.
    pub max_retries: u32,
    /// Backoff base; attempt k (0-based, k ≥ 1) waits `base * 2^(k-1)`.
    pub retry_base_delay_ms: u64,
}

impl RunConfig {
    /// Select the preset for `total` items under `profile`.
    pub fn select(total: usize, profile: Profile) -> Self {
        let (batch_size, batch_interval_ms, per_item_delay_ms) = match profile {
            Profile::Cautious => (21, 9_000, 1_001),
            Profile::Fast => (55, 0, 233),
            Profile::Normal if total > VERY_LARGE_THRESHOLD => (89, 13_000, 741),
            Profile::Normal if total >= MEDIUM_THRESHOLD => (89, 8_000, 639),
            Profile::Normal => (144, 5_000, 369),
        };
        Self {
            batch_size,
            batch_interval_ms,
            per_item_delay_ms,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }

    /// Apply `[retry]` overrides from the config file.
    pub fn with_retry(mut self, retry: Option<&RetryConfig>) -> Self {
        if let Some(r) = retry {
            self.max_retries = r.max_retries;
            self.retry_base_delay_ms = r.retry_base_delay_ms.max(1);
        }
        self
    }

    /// Clamp fields to their valid ranges (batch size and backoff base are at least 1).
    pub fn sanitized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.retry_base_delay_ms = self.retry_base_delay_ms.max(1);
        self
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn per_item_delay(&self) -> Duration {
        Duration::from_millis(self.per_item_delay_ms)
    }
}
