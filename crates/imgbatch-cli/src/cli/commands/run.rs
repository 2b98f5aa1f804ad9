//! `imgbatch run` – download a URL list in batches.

use anyhow::{Context, Result};
use imgbatch_core::config::ImgbatchConfig;
use imgbatch_core::discovery;
use imgbatch_core::normalize::Normalizer;
use imgbatch_core::profile::{Profile, RunConfig};
use imgbatch_core::progress_db::ProgressDb;
use imgbatch_core::retry::{ItemOutcome, SkipReason};
use imgbatch_core::scheduler::{resolve_start, BatchScheduler, RunEvent, RunSummary, StartPoint};
use imgbatch_core::transfer::{AssetValidator, CurlFetcher, CurlOptions, Transfer};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Parsed `run` arguments.
#[derive(Debug)]
pub struct RunOptions {
    pub urls: String,
    pub out_dir: PathBuf,
    pub profile: Profile,
    pub resume: bool,
    pub restart: bool,
    pub overwrite: bool,
}

pub async fn run_batch(db: &ProgressDb, cfg: &ImgbatchConfig, opts: RunOptions) -> Result<()> {
    let raws = discovery::read_url_list(Path::new(&opts.urls))?;
    let site = cfg.site();
    let set = discovery::collect(&Normalizer::new(site.clone()), &raws);
    println!(
        "{} images found ({} rejected, {} duplicates)",
        set.len(),
        set.rejected(),
        set.duplicates()
    );
    if set.is_empty() {
        discard_stale_checkpoint(db, &cfg.progress_key, 0).await?;
        println!("Nothing to download.");
        return Ok(());
    }

    let run_cfg = RunConfig::select(set.len(), opts.profile)
        .with_retry(cfg.retry.as_ref())
        .sanitized();
    tracing::info!(profile = opts.profile.as_str(), ?run_cfg, "run config selected");

    std::fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("create output dir: {}", opts.out_dir.display()))?;

    let resume_accepted = decide_resume(db, &cfg.progress_key, set.len(), &opts).await?;

    let validator = AssetValidator::for_site(&site).context("build asset URL pattern")?;
    let transfer = Transfer::new(
        CurlFetcher::new(CurlOptions::from_config(cfg)),
        validator,
        &opts.out_dir,
        cfg.output_prefix.clone(),
    )
    .overwrite(opts.overwrite);

    let (events_tx, events_rx) = tokio::sync::mpsc::channel::<RunEvent>(64);
    let printer = tokio::spawn(print_events(events_rx));

    let scheduler =
        BatchScheduler::new(db.clone(), cfg.progress_key.clone(), transfer).with_events(events_tx);
    let summary = scheduler.run(&set, &run_cfg, resume_accepted).await;
    drop(scheduler);
    let _ = printer.await;

    print_summary(&summary, &opts.out_dir);
    Ok(())
}

/// Resume decision: flags win; otherwise ask when a usable checkpoint exists.
async fn decide_resume(
    db: &ProgressDb,
    key: &str,
    total: usize,
    opts: &RunOptions,
) -> Result<bool> {
    if opts.restart {
        return Ok(false);
    }
    if opts.resume {
        return Ok(true);
    }
    let record = db.load(key).await?;
    let StartPoint::Resume(index) = resolve_start(record.as_ref(), total, true) else {
        return Ok(false);
    };
    print!(
        "Checkpoint found: {} of {} items done. Resume? [Y/n] ",
        index, total
    );
    std::io::stdout().flush()?;
    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .context("prompt task failed")?
    .context("read answer")?;
    Ok(accepts(&answer))
}

/// Removes a checkpoint written for a set of a different size.
pub(crate) async fn discard_stale_checkpoint(
    db: &ProgressDb,
    key: &str,
    total: usize,
) -> Result<bool> {
    let record = db.load(key).await?;
    match resolve_start(record.as_ref(), total, false) {
        StartPoint::Mismatch { stored_total } => {
            tracing::warn!(key, stored_total, total, "checkpoint is for a different item set, discarding");
            db.clear(key).await
        }
        StartPoint::Fresh | StartPoint::Resume(_) => Ok(false),
    }
}

/// Empty input (or EOF) takes the default, which is yes.
pub(crate) fn accepts(answer: &str) -> bool {
    !matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "n" | "no"
    )
}

async fn print_events(mut rx: tokio::sync::mpsc::Receiver<RunEvent>) {
    let mut done = 0usize;
    let mut total = 0usize;
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Started {
                total: t,
                start_index,
                batches,
            } => {
                total = t;
                done = start_index;
                println!(
                    "Starting at item {} of {} ({} batches)",
                    start_index + 1,
                    t,
                    batches
                );
            }
            RunEvent::BatchStarted {
                number,
                batches,
                range,
            } => println!(
                "Batch {}/{}: items {}-{}",
                number,
                batches,
                range.start + 1,
                range.end
            ),
            RunEvent::ItemFinished(report) => {
                done += 1;
                match &report.outcome {
                    ItemOutcome::Success(_) => {}
                    ItemOutcome::Skipped(SkipReason::AlreadyPresent(path)) => {
                        println!("  #{} already saved as {}", report.index + 1, path.display())
                    }
                    ItemOutcome::Skipped(SkipReason::Invalid(e)) => {
                        println!("  #{} skipped: {}", report.index + 1, e)
                    }
                    ItemOutcome::Failed(e) => println!(
                        "  #{} failed after {} attempt(s): {} ({})",
                        report.index + 1,
                        report.attempts,
                        e,
                        report.id
                    ),
                }
            }
            RunEvent::CheckpointSaved {
                last_completed_index,
                ..
            } => println!("  {}/{} processed, checkpoint {}", done, total, last_completed_index),
            RunEvent::CoolingDown(d) => println!("  cooling down {:.1}s", d.as_secs_f64()),
        }
    }
}

fn print_summary(summary: &RunSummary, out_dir: &Path) {
    println!(
        "Done: {} saved, {} failed, {} skipped ({:.1} MiB) in {}",
        summary.succeeded,
        summary.failed,
        summary.skipped,
        summary.bytes_written as f64 / 1_048_576.0,
        out_dir.display()
    );
    if summary.rate_limited > 0 {
        println!(
            "Server rate-limited {} request(s); consider --profile cautious.",
            summary.rate_limited
        );
    }
    if !summary.checkpoint_cleared {
        println!("Checkpoint kept; rerun with --resume to continue.");
    }
}
