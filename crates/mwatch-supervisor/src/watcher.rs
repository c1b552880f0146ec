//! Content-digest file watcher
//!
//! Polling, not event based: every [`FileWatcher::check`] re-hashes the whole
//! tree, so callers should not call it more often than once per reader slice.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{Result, SupervisorError};
use crate::spec::WatchSpec;

/// Name filter used when none is configured
pub const DEFAULT_WATCH_PATTERN: &str = "*.py";

/// Detects content changes under a directory tree
#[derive(Debug)]
pub struct FileWatcher {
    root: PathBuf,
    filter: GlobSet,
    last_digest: Option<String>,
}

impl FileWatcher {
    /// Watch `root` for files matching the default pattern
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_patterns(root, [DEFAULT_WATCH_PATTERN])
    }

    /// Watch `root` for files whose name matches any of `patterns`
    pub fn with_patterns<I, S>(root: impl Into<PathBuf>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|source| SupervisorError::WatchPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let filter = builder.build().map_err(|source| SupervisorError::WatchPattern {
            pattern: "<set>".to_string(),
            source,
        })?;

        Ok(Self {
            root: root.into(),
            filter,
            last_digest: None,
        })
    }

    /// Build from a slot's watch definition
    pub fn from_spec(spec: &WatchSpec) -> Result<Self> {
        Self::with_patterns(&spec.root, &spec.patterns)
    }

    /// Watched root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Digest stored by the last check
    pub fn last_digest(&self) -> Option<&str> {
        self.last_digest.as_deref()
    }

    /// Report whether the tree changed since the previous call
    ///
    /// The first call only records a baseline and returns false.
    pub fn check(&mut self) -> bool {
        let digest = self.digest();
        match self.last_digest.as_deref() {
            None => {
                debug!(root = %self.root.display(), digest = %digest, "Watcher baseline recorded");
                self.last_digest = Some(digest);
                false
            }
            Some(last) if last != digest => {
                debug!(root = %self.root.display(), digest = %digest, "Watched files changed");
                self.last_digest = Some(digest);
                true
            }
            Some(_) => false,
        }
    }

    /// SHA-256 over the bytes of every matching file, in sorted path order
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for path in self.matching_files() {
            match fs::read(&path) {
                Ok(bytes) => hasher.update(&bytes),
                // removed or unreadable between listing and reading
                Err(e) => trace!(path = %path.display(), error = %e, "Skipping unreadable file"),
            }
        }
        hex::encode(hasher.finalize())
    }

    fn matching_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.filter.is_match(entry.file_name()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }
}
