//! Scheduler tests against an in-memory checkpoint store and a scripted fetcher.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{BatchScheduler, RunEvent, RunSummary};
use crate::discovery::{DiscoverySet, ResourceId};
use crate::profile::RunConfig;
use crate::progress_db::db::open_memory;
use crate::progress_db::{ProgressDb, ProgressRecord};
use crate::retry::TransferError;
use crate::transfer::fake::ScriptedFetcher;
use crate::transfer::{AssetValidator, Fetch, Transfer};

const ORIGIN: &str = "https://images.nightcafe.studio";
const KEY: &str = "nightcafe_progress";

fn url(i: usize) -> String {
    format!("{}/jobs/j{}/j{}--1.jpg", ORIGIN, i, i)
}

fn items(n: usize) -> DiscoverySet {
    DiscoverySet::from_ids((0..n).map(|i| ResourceId::new(url(i))))
}

fn quick(batch_size: usize) -> RunConfig {
    RunConfig {
        batch_size,
        batch_interval_ms: 0,
        per_item_delay_ms: 0,
        max_retries: 3,
        retry_base_delay_ms: 1,
    }
}

fn scheduler<F: Fetch>(db: ProgressDb, fetcher: F, out: &std::path::Path) -> BatchScheduler<F> {
    let transfer = Transfer::new(fetcher, AssetValidator::new(ORIGIN).unwrap(), out, "nightcafe");
    BatchScheduler::new(db, KEY, transfer)
}

async fn run_collecting<F: Fetch>(
    sched: BatchScheduler<F>,
    set: &DiscoverySet,
    cfg: &RunConfig,
    resume: bool,
) -> (RunSummary, Vec<RunEvent>) {
    let (tx, mut rx) = mpsc::channel(16);
    let sched = sched.with_events(tx);
    let collect = async {
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        events
    };
    let run = async {
        let summary = sched.run(set, cfg, resume).await;
        drop(sched);
        summary
    };
    tokio::join!(run, collect)
}

fn checkpoints(events: &[RunEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::CheckpointSaved {
                last_completed_index,
                ..
            } => Some(*last_completed_index),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn full_run_checkpoints_each_batch_then_clears() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db.clone(), Arc::clone(&fetcher), dir.path());

    let (summary, events) = run_collecting(sched, &items(250), &quick(89), false).await;

    assert_eq!(checkpoints(&events), vec![89, 178, 250]);
    assert_eq!(summary.succeeded, 250);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 0);
    assert!(summary.checkpoint_cleared);
    assert_eq!(db.load(KEY).await.unwrap(), None);
    assert_eq!(fetcher.call_count(), 250);
    assert!(dir.path().join("nightcafe_0001.jpg").exists());
    assert!(dir.path().join("nightcafe_0250.jpg").exists());
}

#[tokio::test]
async fn accepted_resume_skips_completed_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    db.save(KEY, &ProgressRecord::new(89, 250)).await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db.clone(), Arc::clone(&fetcher), dir.path());

    let (summary, events) = run_collecting(sched, &items(250), &quick(89), true).await;

    let mut fetched = fetcher.urls();
    fetched.sort();
    let mut expected: Vec<String> = (89..250).map(url).collect();
    expected.sort();
    assert_eq!(fetched, expected);
    assert_eq!(summary.start_index, 89);
    assert_eq!(summary.succeeded, 161);
    assert_eq!(checkpoints(&events), vec![178, 250]);
    assert!(summary.checkpoint_cleared);
    assert!(!dir.path().join("nightcafe_0089.jpg").exists());
    assert!(dir.path().join("nightcafe_0090.jpg").exists());
}

#[tokio::test]
async fn declined_resume_starts_over() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    db.save(KEY, &ProgressRecord::new(89, 250)).await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());

    let summary = sched.run(&items(250), &quick(89), false).await;
    assert_eq!(summary.start_index, 0);
    assert_eq!(fetcher.call_count(), 250);
}

#[tokio::test]
async fn mismatched_checkpoint_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    db.save(KEY, &ProgressRecord::new(89, 300)).await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db.clone(), Arc::clone(&fetcher), dir.path());

    assert_eq!(sched.start_index(250, true).await, 0);
    assert_eq!(db.load(KEY).await.unwrap(), None);

    let summary = sched.run(&items(250), &quick(89), true).await;
    assert_eq!(summary.start_index, 0);
    assert_eq!(fetcher.call_count(), 250);
}

#[tokio::test]
async fn failures_do_not_stop_the_run_or_the_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.script(
        &url(3),
        vec![
            Err(TransferError::Http(500)),
            Err(TransferError::Http(502)),
            Err(TransferError::Http(503)),
        ],
    );
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());

    let (summary, events) = run_collecting(sched, &items(10), &quick(4), false).await;

    assert_eq!(checkpoints(&events), vec![4, 8, 10]);
    assert_eq!(summary.succeeded, 9);
    assert_eq!(summary.failed, 1);
    assert!(summary.covers_all());
    assert!(summary.checkpoint_cleared);
    assert_eq!(fetcher.call_count(), 9 + 3);
    assert!(!dir.path().join("nightcafe_0004.jpg").exists());
}

#[tokio::test]
async fn rate_limited_item_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.script(
        &url(0),
        vec![
            Err(TransferError::RateLimited),
            Err(TransferError::RateLimited),
            Ok(b"third time".to_vec()),
        ],
    );
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());

    let (summary, events) = run_collecting(sched, &items(1), &quick(5), false).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rate_limited, 2);
    let finished: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::ItemFinished(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].attempts, 3);
    assert_eq!(finished[0].rate_limited, 2);
    assert_eq!(
        std::fs::read(dir.path().join("nightcafe_0001.jpg")).unwrap(),
        b"third time"
    );
}

#[tokio::test]
async fn invalid_ids_are_skipped_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let set = DiscoverySet::from_ids(vec![
        ResourceId::new(url(0)),
        ResourceId::new("https://cdn.example.com/x.jpg"),
        ResourceId::new(url(2)),
    ]);
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());

    let summary = sched.run(&set, &quick(10), false).await;
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    assert!(!fetcher.urls().iter().any(|u| u.contains("example.com")));
    // Output names follow discovery index even when a neighbour is skipped.
    assert!(dir.path().join("nightcafe_0003.jpg").exists());
    assert!(!dir.path().join("nightcafe_0002.jpg").exists());
}

#[tokio::test]
async fn existing_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("nightcafe_0002.jpg"), b"kept").unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());

    let summary = sched.run(&items(3), &quick(10), false).await;
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(std::fs::read(dir.path().join("nightcafe_0002.jpg")).unwrap(), b"kept");
}

#[tokio::test]
async fn zero_retry_budget_fails_everything_without_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());
    let cfg = RunConfig {
        max_retries: 0,
        ..quick(10)
    };

    let summary = sched.run(&items(5), &cfg, false).await;
    assert_eq!(summary.failed, 5);
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn empty_set_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());

    let summary = sched.run(&DiscoverySet::default(), &quick(10), false).await;
    assert_eq!(summary.processed(), 0);
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn empty_set_discards_checkpoint_for_other_set() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    db.save(KEY, &ProgressRecord::new(89, 250)).await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db.clone(), Arc::clone(&fetcher), dir.path());

    let summary = sched.run(&DiscoverySet::default(), &quick(10), true).await;
    assert_eq!(summary.processed(), 0);
    assert!(summary.checkpoint_cleared);
    assert!(db.load(KEY).await.unwrap().is_none());
    assert_eq!(fetcher.call_count(), 0);
}

/// Holds each request open briefly and records peak concurrency.
#[derive(Default)]
struct SlowFetcher {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Fetch for SlowFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, TransferError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![0u8; 8])
    }
}

#[tokio::test]
async fn concurrency_never_exceeds_batch_size() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(SlowFetcher::default());
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());

    let summary = sched.run(&items(10), &quick(4), false).await;
    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.bytes_written, 80);
    assert_eq!(fetcher.peak.load(Ordering::SeqCst), 4);
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn launches_are_staggered_and_batches_cool_down() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_memory().await.unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sched = scheduler(db, Arc::clone(&fetcher), dir.path());
    let cfg = RunConfig {
        batch_size: 3,
        batch_interval_ms: 40,
        per_item_delay_ms: 20,
        max_retries: 1,
        retry_base_delay_ms: 1,
    };

    let (summary, events) = run_collecting(sched, &items(4), &cfg, false).await;
    assert_eq!(summary.succeeded, 4);

    let calls = fetcher.calls();
    let at = |u: String| calls.iter().find(|(c, _)| *c == u).map(|(_, t)| *t).unwrap();
    assert!(at(url(1)) - at(url(0)) >= Duration::from_millis(20));
    assert!(at(url(2)) - at(url(0)) >= Duration::from_millis(40));
    // Second batch waits for the cool-down after the first batch's last launch.
    assert!(at(url(3)) - at(url(2)) >= Duration::from_millis(40));

    let cooldowns = events
        .iter()
        .filter(|e| matches!(e, RunEvent::CoolingDown(_)))
        .count();
    assert_eq!(cooldowns, 1);
}
