use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::temp_path;

/// Write `bytes` to `final_path` atomically: temp file, fsync, rename.
/// On failure the temp file is removed and `final_path` is left untouched.
pub fn write_atomic(final_path: &Path, bytes: &[u8]) -> Result<u64> {
    let tmp = temp_path(final_path);
    match write_and_rename(&tmp, final_path, bytes) {
        Ok(()) => Ok(bytes.len() as u64),
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&tmp) {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!("failed to remove {}: {}", tmp.display(), rm);
                }
            }
            Err(e)
        }
    }
}

fn write_and_rename(tmp: &Path, final_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(tmp)
        .with_context(|| format!("failed to create temp file: {}", tmp.display()))?;
    file.write_all(bytes).context("storage write failed")?;
    file.sync_all().context("storage sync failed")?;
    drop(file);
    std::fs::rename(tmp, final_path).with_context(|| {
        format!("failed to rename {} to {}", tmp.display(), final_path.display())
    })?;
    Ok(())
}
