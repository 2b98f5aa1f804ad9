//! Transfer executor: validate one identifier, fetch it, save it under its sequential name.

mod fetch;
mod validate;

#[cfg(test)]
pub(crate) mod fake;

pub use fetch::{CurlFetcher, CurlOptions, Fetch};
pub use validate::AssetValidator;

use std::path::PathBuf;

use crate::discovery::ResourceId;
use crate::retry::TransferError;
use crate::storage;

/// An item that passed validation and has a destination; ready to fetch.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub index: usize,
    pub url: String,
    pub dest: PathBuf,
}

/// Fetches and stores assets into one flat output directory.
pub struct Transfer<F> {
    fetcher: F,
    validator: AssetValidator,
    out_dir: PathBuf,
    prefix: String,
    overwrite: bool,
}

impl<F: Fetch> Transfer<F> {
    pub fn new(
        fetcher: F,
        validator: AssetValidator,
        out_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            validator,
            out_dir: out_dir.into(),
            prefix: prefix.into(),
            overwrite: false,
        }
    }

    /// Replace files that already exist instead of skipping them.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Destination for the item at `index`, given its extension.
    pub fn destination(&self, index: usize, ext: &str) -> PathBuf {
        self.out_dir
            .join(storage::sequence_name(&self.prefix, index, ext))
    }

    /// Checks that need no network: id validity and destination presence.
    pub fn prepare(&self, index: usize, id: &ResourceId) -> Result<Prepared, TransferError> {
        let ext = self.validator.validate(id)?;
        let dest = self.destination(index, &ext);
        if !self.overwrite && dest.exists() {
            return Err(TransferError::AlreadyPresent(dest));
        }
        Ok(Prepared {
            index,
            url: id.as_str().to_string(),
            dest,
        })
    }

    /// One network attempt plus atomic write. Returns bytes written.
    pub async fn fetch_and_save(&self, prepared: &Prepared) -> Result<u64, TransferError> {
        let bytes = self.fetcher.fetch(&prepared.url).await?;
        let dest = prepared.dest.clone();
        tokio::task::spawn_blocking(move || storage::write_atomic(&dest, &bytes))
            .await
            .map_err(|e| TransferError::Storage(format!("write task failed: {}", e)))?
            .map_err(|e| TransferError::Storage(format!("{:#}", e)))
    }

    /// `prepare` then `fetch_and_save`, without retries.
    pub async fn transfer(&self, index: usize, id: &ResourceId) -> Result<u64, TransferError> {
        let prepared = self.prepare(index, id)?;
        self.fetch_and_save(&prepared).await
    }
}
