//! Discovery and deduplication of the page paths to compare.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::runner::PageRecord;

/// Distinct page paths of a run, keyed by path
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    records: BTreeMap<String, PageRecord>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the starting path. Returns false if it was already known.
    pub fn add_seed(&mut self, path: &str) -> bool {
        self.insert(path)
    }

    /// Register the same-origin pages among `urls`.
    ///
    /// Cross-origin URLs, URLs with a fragment and already known paths are
    /// skipped. Returns how many new paths were registered.
    pub fn discover<I, S>(&mut self, base_url: &str, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for url in urls {
            let url = url.as_ref();
            let Some(path) = derive_path(base_url, url) else {
                debug!(%url, "skipping link");
                continue;
            };
            if self.insert(&path) {
                info!(%url, %path, "adding new link for capture");
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&PageRecord> {
        self.records.get(path)
    }

    /// Registered paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Hand the pending records over to the run
    pub fn into_records(self) -> BTreeMap<String, PageRecord> {
        self.records
    }

    fn insert(&mut self, path: &str) -> bool {
        if self.records.contains_key(path) {
            return false;
        }
        self.records.insert(path.to_string(), PageRecord::pending(path));
        true
    }
}

/// Derive the page path of `url` relative to `base_url`.
///
/// This single transform decides both membership and the stored key: the URL
/// must start with the exact base string, followed by nothing, a `/` or a `?`.
/// URLs carrying a `#` fragment marker or repeating the base after the prefix
/// are rejected. The base itself maps to `/`.
pub fn derive_path(base_url: &str, url: &str) -> Option<String> {
    if base_url.is_empty() || url.contains('#') {
        return None;
    }
    let rest = url.strip_prefix(base_url)?;
    if rest.is_empty() {
        return Some("/".to_string());
    }
    if rest.contains(base_url) {
        return None;
    }
    if rest.starts_with('/') || rest.starts_with('?') {
        Some(rest.to_string())
    } else {
        None
    }
}
