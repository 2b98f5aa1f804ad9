//! CLI command handlers, one file per command.

mod export;
mod reset;
mod run;
mod status;

pub use export::run_export;
pub use reset::run_reset;
pub use run::{run_batch, RunOptions};
pub use status::run_status;

#[cfg(test)]
pub(crate) use run::{accepts as run_accepts, discard_stale_checkpoint};
