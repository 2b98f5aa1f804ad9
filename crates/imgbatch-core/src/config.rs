use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retry overrides (optional `[retry]` section in config.toml).
/// When absent, the values of the selected profile are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per item (including the first). 0 disables fetching entirely.
    pub max_retries: u32,
    /// Base delay in milliseconds; attempt k waits `base * 2^(k-1)`.
    pub retry_base_delay_ms: u64,
}

/// Where gallery assets live and how discovered URLs map onto them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Substring a raw URL must contain to be considered a gallery asset.
    pub marker: String,
    /// Scheme and host of full-resolution assets, without trailing slash.
    pub asset_origin: String,
    /// Path fragments of interface assets that are never downloaded.
    pub excluded_segments: Vec<String>,
    /// Path fragments that already denote a full-resolution asset.
    pub full_res_segments: Vec<String>,
    /// Full-resolution path for a job id; `{job}` is substituted.
    #[serde(default = "default_job_path_template")]
    pub job_path_template: String,
}

fn default_job_path_template() -> String {
    "/jobs/{job}/{job}--1.jpg".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            marker: "nightcafe".to_string(),
            asset_origin: "https://images.nightcafe.studio".to_string(),
            excluded_segments: vec!["/assets/".to_string()],
            full_res_segments: vec!["/jobs/".to_string(), "/ik-seo/".to_string()],
            job_path_template: default_job_path_template(),
        }
    }
}

/// Global configuration loaded from `~/.config/imgbatch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImgbatchConfig {
    /// Prefix of saved files: `<prefix>_0001.jpg`.
    pub output_prefix: String,
    /// Key under which the run checkpoint is stored.
    pub progress_key: String,
    /// User-Agent header sent with every asset request.
    pub user_agent: String,
    /// TCP/TLS connect timeout per request.
    pub connect_timeout_secs: u64,
    /// Total timeout per request.
    pub request_timeout_secs: u64,
    /// Responses larger than this are aborted and treated as transport failures.
    pub max_asset_bytes: u64,
    /// Optional retry overrides; if missing, profile defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional site override; if missing, NightCafe defaults are used.
    #[serde(default)]
    pub site: Option<SiteConfig>,
}

impl Default for ImgbatchConfig {
    fn default() -> Self {
        Self {
            output_prefix: "nightcafe".to_string(),
            progress_key: "nightcafe_progress".to_string(),
            user_agent: concat!("imgbatch/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: 15,
            request_timeout_secs: 120,
            max_asset_bytes: 64 * 1024 * 1024,
            retry: None,
            site: None,
        }
    }
}

impl ImgbatchConfig {
    /// Site parameters in effect (config override or defaults).
    pub fn site(&self) -> SiteConfig {
        self.site.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imgbatch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ImgbatchConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like `load_or_init` but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<ImgbatchConfig> {
    if !path.exists() {
        let default_cfg = ImgbatchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: ImgbatchConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
