//! Scripted fetcher for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

use super::Fetch;
use crate::retry::TransferError;

/// Answers from a per-URL script, then falls back to a fixed body.
/// Every call is recorded with the (possibly paused) tokio clock.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, TransferError>>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, url: &str, responses: Vec<Result<Vec<u8>, TransferError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
    }

    pub(crate) fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|(u, _)| u).collect()
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        self.calls.lock().unwrap().push((url.to_string(), Instant::now()));
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|q| q.pop_front());
        next.unwrap_or_else(|| Ok(format!("body of {}", url).into_bytes()))
    }
}
