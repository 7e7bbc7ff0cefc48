//! On-disk blob cache keyed by sanitized URL.
//!
//! One file per URL, holding exactly the bytes the server returned. A hit
//! short-circuits the network; writes are atomic so an interrupted fetch
//! never leaves a partial entry.

use std::path::{Path, PathBuf};

use pomdep_util::errors::{PomdepError, PomdepResult};
use pomdep_util::fs;

/// Flat directory of `.cache` files, one per fetched URL.
#[derive(Debug, Clone)]
pub struct BlobCache {
    dir: PathBuf,
}

impl BlobCache {
    /// Open a cache at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> PomdepResult<Self> {
        fs::ensure_dir(dir).map_err(PomdepError::Io)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a URL: lowercased, with every run of characters
    /// outside `[a-z0-9_.-]` collapsed to a single `_`, plus a `.cache`
    /// suffix.
    pub fn key(url: &str) -> String {
        let mut key = String::with_capacity(url.len() + 6);
        let mut in_gap = false;
        for ch in url.to_lowercase().chars() {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '.' | '-') {
                key.push(ch);
                in_gap = false;
            } else if !in_gap {
                key.push('_');
                in_gap = true;
            }
        }
        key.push_str(".cache");
        key
    }

    /// Path an entry for `url` lives at (whether or not it exists).
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(Self::key(url))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.path_for(url).is_file()
    }

    /// Cached bytes for `url`, if present.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path_for(url)).ok()
    }

    /// Store bytes for `url`, returning the entry path.
    pub fn put(&self, url: &str, data: &[u8]) -> PomdepResult<PathBuf> {
        let path = self.path_for(url);
        fs::write_atomic(&path, data).map_err(PomdepError::Io)?;
        Ok(path)
    }

    /// Remove and recreate the whole cache directory.
    ///
    /// Not safe to call while other threads use the cache.
    pub fn clear(&self) -> PomdepResult<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir).map_err(PomdepError::Io)?;
        }
        fs::ensure_dir(&self.dir).map_err(PomdepError::Io)?;
        Ok(())
    }
}
