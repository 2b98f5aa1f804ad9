//! CLI for the imgbatch gallery downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imgbatch_core::config;
use imgbatch_core::profile::Profile;
use imgbatch_core::progress_db::ProgressDb;
use std::path::PathBuf;

use commands::{run_batch, run_export, run_reset, run_status, RunOptions};

/// Top-level CLI for imgbatch.
#[derive(Debug, Parser)]
#[command(name = "imgbatch")]
#[command(about = "imgbatch: batched, resumable gallery image downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every image in a URL list, in batches, with resume.
    Run {
        /// File with one raw image URL per line (`-` for stdin).
        urls: String,
        /// Output directory (default: current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Pacing profile: normal (sized by item count), cautious, or fast.
        #[arg(long, default_value = "normal")]
        profile: Profile,
        /// Resume from the stored checkpoint without asking.
        #[arg(long, conflicts_with = "restart")]
        resume: bool,
        /// Ignore any stored checkpoint and start from the first item.
        #[arg(long)]
        restart: bool,
        /// Re-download files that already exist in the output directory.
        #[arg(long)]
        overwrite: bool,
    },

    /// Normalize and deduplicate a URL list and write the canonical URLs.
    Export {
        /// File with one raw image URL per line (`-` for stdin).
        urls: String,
        /// Destination file (default: `<output_prefix>_urls.txt`).
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show the stored checkpoint.
    Status,

    /// Delete the stored checkpoint.
    Reset,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                urls,
                out,
                profile,
                resume,
                restart,
                overwrite,
            } => {
                let db = ProgressDb::open_default().await?;
                let out_dir = match out {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                let opts = RunOptions {
                    urls,
                    out_dir,
                    profile,
                    resume,
                    restart,
                    overwrite,
                };
                run_batch(&db, &cfg, opts).await?;
            }
            CliCommand::Export { urls, output } => run_export(&cfg, &urls, output)?,
            CliCommand::Status => {
                let db = ProgressDb::open_default().await?;
                run_status(&db, &cfg.progress_key).await?;
            }
            CliCommand::Reset => {
                let db = ProgressDb::open_default().await?;
                run_reset(&db, &cfg.progress_key).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
