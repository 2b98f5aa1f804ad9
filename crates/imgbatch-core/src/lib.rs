pub mod config;
pub mod logging;

pub mod discovery;
pub mod normalize;
pub mod profile;
pub mod progress_db;
pub mod retry;
pub mod scheduler;
pub mod storage;
pub mod transfer;
