//! User tag lookup used by tag filter clauses
//!
//! Tags are assigned by an external classifier; the search side only needs to
//! read them for a path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of the user tags attached to a file
pub trait TagLookup: Send + Sync {
    fn tags(&self, path: &Path) -> Vec<String>;

    /// Case-insensitive substring match against any of the path's tags
    fn has_tag(&self, path: &Path, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.tags(path)
            .iter()
            .any(|candidate| candidate.to_lowercase().contains(&needle))
    }
}

/// No file carries any tag
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTags;

impl TagLookup for NoTags {
    fn tags(&self, _path: &Path) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory path → tags table
#[derive(Debug, Clone, Default)]
pub struct TagMap {
    tags: HashMap<PathBuf, Vec<String>>,
}

impl TagMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, tag: impl Into<String>) {
        self.tags.entry(path.into()).or_default().push(tag.into());
    }

    #[must_use]
    pub fn with_tag(mut self, path: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        self.insert(path, tag);
        self
    }
}

impl TagLookup for TagMap {
    fn tags(&self, path: &Path) -> Vec<String> {
        self.tags.get(path).cloned().unwrap_or_default()
    }
}
