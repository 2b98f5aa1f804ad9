//! `imgbatch reset` – delete the stored checkpoint.

use anyhow::Result;
use imgbatch_core::progress_db::ProgressDb;

pub async fn run_reset(db: &ProgressDb, key: &str) -> Result<()> {
    if db.clear(key).await? {
        tracing::info!(key, "checkpoint cleared by operator");
        println!("Checkpoint {} cleared.", key);
    } else {
        println!("No checkpoint stored under {}.", key);
    }
    Ok(())
}
