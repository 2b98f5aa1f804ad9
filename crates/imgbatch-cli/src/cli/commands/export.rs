//! `imgbatch export` – write the canonical, deduplicated URL list.

use anyhow::{Context, Result};
use imgbatch_core::config::ImgbatchConfig;
use imgbatch_core::discovery::{self, DiscoverySet};
use imgbatch_core::normalize::Normalizer;
use std::path::{Path, PathBuf};

pub fn run_export(cfg: &ImgbatchConfig, urls: &str, output: Option<PathBuf>) -> Result<()> {
    let raws = discovery::read_url_list(Path::new(urls))?;
    let set = discovery::collect(&Normalizer::new(cfg.site()), &raws);
    let path = output.unwrap_or_else(|| default_export_path(&cfg.output_prefix));
    write_url_list(&set, &path)?;
    println!(
        "Exported {} URLs to {} ({} rejected, {} duplicates)",
        set.len(),
        path.display(),
        set.rejected(),
        set.duplicates()
    );
    Ok(())
}

pub(crate) fn default_export_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}_urls.txt", prefix))
}

/// One canonical URL per line, in discovery order.
pub(crate) fn write_url_list(set: &DiscoverySet, path: &Path) -> Result<()> {
    let mut text = String::new();
    for id in set.iter() {
        text.push_str(id.as_str());
        text.push('\n');
    }
    std::fs::write(path, text).with_context(|| format!("write URL list: {}", path.display()))
}
