//! Asset URL validation before any network call.

use regex::Regex;

use crate::config::SiteConfig;
use crate::discovery::ResourceId;
use crate::retry::ValidationError;

/// Accepts only image URLs under the configured asset origin.
#[derive(Debug, Clone)]
pub struct AssetValidator {
    pattern: Regex,
}

impl AssetValidator {
    /// `origin` is scheme and host, e.g. `https://images.nightcafe.studio`.
    pub fn new(origin: &str) -> Result<Self, regex::Error> {
        let origin = origin.trim_end_matches('/');
        let pattern = Regex::new(&format!(
            r"(?i)^{}/.+\.(jpg|jpeg|png|webp)$",
            regex::escape(origin)
        ))?;
        Ok(Self { pattern })
    }

    pub fn for_site(site: &SiteConfig) -> Result<Self, regex::Error> {
        Self::new(&site.asset_origin)
    }

    /// Returns the lower-cased file extension of a valid id.
    pub fn validate(&self, id: &ResourceId) -> Result<String, ValidationError> {
        let caps = self.pattern.captures(id.as_str()).ok_or_else(|| ValidationError {
            id: id.as_str().to_string(),
            pattern: self.pattern.as_str().to_string(),
        })?;
        Ok(caps[1].to_ascii_lowercase())
    }
}
