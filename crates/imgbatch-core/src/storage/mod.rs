//! Output naming and on-disk file lifecycle.
//!
//! Each asset is written to `<name>.part`, synced, then renamed onto its
//! sequential final name, so a finished file is never observed half-written.

mod writer;

pub use writer::write_atomic;

use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Output file name for the item at 0-based `index`: `<prefix>_0001.<ext>` for index 0.
/// Numbers past 9999 simply grow wider.
pub fn sequence_name(prefix: &str, index: usize, ext: &str) -> String {
    format!("{}_{:04}.{}", prefix, index + 1, ext)
}

/// Path for the temp file: appends `.part` to the final path (e.g. `a_0001.jpg` → `a_0001.jpg.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}
