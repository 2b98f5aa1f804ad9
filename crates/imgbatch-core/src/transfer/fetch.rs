//! HTTP GET of one asset into memory.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ImgbatchConfig;
use crate::retry::{classify_curl_error, ErrorKind, TransferError};

/// Fetches the body of one asset URL.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Returns the body on 2xx; `RateLimited` on 429; `Http(code)` on any other status.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError>;
}

#[async_trait]
impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        (**self).fetch(url).await
    }
}

/// Curl options for asset requests.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Abort bodies larger than this.
    pub max_bytes: u64,
}

impl CurlOptions {
    pub fn from_config(cfg: &ImgbatchConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
            max_bytes: cfg.max_asset_bytes,
        }
    }
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from_config(&ImgbatchConfig::default())
    }
}

/// libcurl-backed fetcher; each request runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    opts: CurlOptions,
}

impl CurlFetcher {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }
}

#[async_trait]
impl Fetch for CurlFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let url = url.to_string();
        let opts = self.opts.clone();
        tokio::task::spawn_blocking(move || get_blocking(&url, &opts))
            .await
            .map_err(|e| TransferError::Transport {
                kind: ErrorKind::Other,
                message: format!("fetch task failed: {}", e),
            })?
    }
}

fn curl_err(e: curl::Error) -> TransferError {
    TransferError::Transport {
        kind: classify_curl_error(&e),
        message: e.to_string(),
    }
}

fn get_blocking(url: &str, opts: &CurlOptions) -> Result<Vec<u8>, TransferError> {
    let mut body = Vec::new();
    let mut oversized = false;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(curl_err)?;
    easy.get(true).map_err(curl_err)?;
    easy.follow_location(true).map_err(curl_err)?;
    easy.max_redirections(10).map_err(curl_err)?;
    easy.useragent(&opts.user_agent).map_err(curl_err)?;
    easy.connect_timeout(opts.connect_timeout).map_err(curl_err)?;
    easy.timeout(opts.timeout).map_err(curl_err)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if body.len() as u64 + data.len() as u64 > opts.max_bytes {
                    oversized = true;
                    return Ok(0); // abort transfer
                }
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(curl_err)?;
        transfer.perform()
    };

    if oversized {
        return Err(TransferError::Transport {
            kind: ErrorKind::Other,
            message: format!("response exceeds {} bytes", opts.max_bytes),
        });
    }
    performed.map_err(curl_err)?;

    let code = easy.response_code().map_err(curl_err)?;
    match code {
        200..=299 => Ok(body),
        429 => Err(TransferError::RateLimited),
        _ => Err(TransferError::Http(code)),
    }
}
