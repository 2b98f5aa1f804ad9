use imgbatch_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {:#}", e);
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("imgbatch error: {:#}", err);
        std::process::exit(1);
    }
}
