//! URL normalization: raw discovered URL → canonical `ResourceId`.
//!
//! Rules, in order: reject non-gallery URLs and interface assets, strip the
//! query and fragment, strip thumbnail/size variants, and rewrite filenames
//! that only carry a job id to the full-resolution job path. The function is
//! pure and idempotent: feeding its output back in yields the same id.

mod thumbnail;

pub use thumbnail::strip_thumbnail_markers;

use crate::config::SiteConfig;
use crate::discovery::ResourceId;

/// Canonicalizes raw URLs for one gallery site.
#[derive(Debug, Clone)]
pub struct Normalizer {
    site: SiteConfig,
}

impl Normalizer {
    pub fn new(site: SiteConfig) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Returns the canonical id for `raw`, or `None` if it is not a target asset.
    pub fn normalize(&self, raw: &str) -> Option<ResourceId> {
        let raw = raw.trim();
        let mut url = url::Url::parse(raw).ok()?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return None;
        }
        url.set_query(None);
        url.set_fragment(None);

        // (a) target site
        if !url.as_str().contains(&self.site.marker) {
            return None;
        }
        // (b) interface assets
        if self
            .site
            .excluded_segments
            .iter()
            .any(|seg| url.path().contains(seg.as_str()))
        {
            return None;
        }

        let stripped = strip_thumbnail_markers(url.path());
        url.set_path(&stripped);

        if let Some(rewritten) = self.rewrite_to_job_path(&url) {
            return Some(rewritten);
        }
        Some(ResourceId::new(url.as_str()))
    }

    /// Job-id rewrite for filenames like `<job>_<marker>...` outside full-resolution paths.
    fn rewrite_to_job_path(&self, url: &url::Url) -> Option<ResourceId> {
        let path = url.path();
        if self
            .site
            .full_res_segments
            .iter()
            .any(|seg| path.contains(seg.as_str()))
        {
            return None;
        }
        let filename = path.rsplit('/').next().unwrap_or("");
        if !filename.contains(&self.site.marker) {
            return None;
        }
        let job = filename.split('_').next().unwrap_or("");
        if job.is_empty() {
            return None;
        }
        let target = format!(
            "{}{}",
            self.site.asset_origin.trim_end_matches('/'),
            self.site.job_path_template.replace("{job}", job)
        );
        let mut parsed = url::Url::parse(&target).ok()?;
        // A job id such as `thumbnail` can reintroduce a marker segment.
        let stripped = strip_thumbnail_markers(parsed.path());
        parsed.set_path(&stripped);
        Some(ResourceId::new(parsed.as_str()))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(SiteConfig::default())
    }
}
