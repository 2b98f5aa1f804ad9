//! `imgbatch status` – show the stored checkpoint.

use anyhow::Result;
use imgbatch_core::progress_db::ProgressDb;

pub async fn run_status(db: &ProgressDb, key: &str) -> Result<()> {
    match db.load(key).await? {
        None => println!("No checkpoint stored under {}.", key),
        Some(record) => {
            let age = record.age().as_secs();
            println!(
                "{}: {} of {} items done (saved {}m {}s ago)",
                key,
                record.last_completed_index,
                record.total,
                age / 60,
                age % 60
            );
            println!("Run with --resume to continue, or `imgbatch reset` to discard.");
        }
    }
    Ok(())
}
