//! Discovery set: the frozen, ordered, deduplicated list of assets for one run.
//!
//! Raw URLs arrive from an external producer (a URL list exported from the
//! gallery page). Each one is normalized; rejects and duplicates are counted
//! and dropped. Insertion order is preserved because the index of an item
//! names its output file and drives resume.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use crate::normalize::Normalizer;

/// Canonical identifier of one downloadable asset (its normalized URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap an already-canonical URL. Use `Normalizer::normalize` for raw input.
    pub fn new(canonical: impl Into<String>) -> Self {
        ResourceId(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happened to one raw URL fed into the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    Added,
    Duplicate,
    Rejected,
}

/// Incrementally collects normalized identifiers until discovery completes.
pub struct DiscoveryBuilder<'n> {
    normalizer: &'n Normalizer,
    seen: HashSet<ResourceId>,
    items: Vec<ResourceId>,
    rejected: usize,
    duplicates: usize,
}

impl<'n> DiscoveryBuilder<'n> {
    pub fn new(normalizer: &'n Normalizer) -> Self {
        Self {
            normalizer,
            seen: HashSet::new(),
            items: Vec::new(),
            rejected: 0,
            duplicates: 0,
        }
    }

    /// Normalize and add one raw URL.
    pub fn push(&mut self, raw: &str) -> Pushed {
        let Some(id) = self.normalizer.normalize(raw) else {
            self.rejected += 1;
            return Pushed::Rejected;
        };
        if !self.seen.insert(id.clone()) {
            self.duplicates += 1;
            return Pushed::Duplicate;
        }
        self.items.push(id);
        Pushed::Added
    }

    /// Add every URL of one producer round; returns how many new identifiers it yielded.
    pub fn extend<I, S>(&mut self, raws: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raws.into_iter()
            .filter(|raw| self.push(raw.as_ref()) == Pushed::Added)
            .count()
    }

    /// Number of unique identifiers collected so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Freeze into an immutable set. No further growth is possible.
    pub fn freeze(self) -> DiscoverySet {
        tracing::debug!(
            unique = self.items.len(),
            rejected = self.rejected,
            duplicates = self.duplicates,
            "discovery set frozen"
        );
        DiscoverySet {
            items: self.items,
            rejected: self.rejected,
            duplicates: self.duplicates,
        }
    }
}

/// Ordered, deduplicated, immutable list of identifiers handed to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySet {
    items: Vec<ResourceId>,
    rejected: usize,
    duplicates: usize,
}

impl DiscoverySet {
    /// Build a set from already-canonical identifiers, dropping repeats (first wins).
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ResourceId>,
    {
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut duplicates = 0;
        for id in ids {
            if seen.insert(id.clone()) {
                items.push(id);
            } else {
                duplicates += 1;
            }
        }
        Self {
            items,
            rejected: 0,
            duplicates,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResourceId> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[ResourceId] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        self.items.iter()
    }

    /// Raw URLs that were not gallery assets.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Raw URLs that normalized to an identifier already present.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Read raw URLs, one per line; blank lines and `#` comments are ignored.
pub fn read_url_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line.context("read URL list")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        urls.push(line.to_string());
    }
    Ok(urls)
}

/// Read a URL list from a file, or from stdin when `path` is `-`.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    if path == Path::new("-") {
        let stdin = std::io::stdin();
        return read_url_lines(stdin.lock());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("open URL list: {}", path.display()))?;
    read_url_lines(std::io::BufReader::new(file))
}

/// Normalize a batch of raw URLs into a frozen discovery set.
pub fn collect<I, S>(normalizer: &Normalizer, raws: I) -> DiscoverySet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = DiscoveryBuilder::new(normalizer);
    builder.extend(raws);
    builder.freeze()
}
