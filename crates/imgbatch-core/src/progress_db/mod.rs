//! Persistent run checkpoint store (SQLite via sqlx).
//!
//! Holds one `ProgressRecord` per run key: how far the scheduler got, for how
//! many items, and when. Survives process exit so an interrupted run can resume
//! at its last batch boundary.

pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
