use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::SystemTime;

/// One (path, last-modified) tuple produced by a keyword query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHit {
    pub path: String,
    pub modified: SystemTime,
}

impl QueryHit {
    pub fn new(path: impl Into<String>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified,
        }
    }
}

/// A result row as seen by the presentation layer
///
/// Derived at read time from the store and the session's keyword count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    /// Full path of the file
    pub path: String,

    /// Match count normalised against the keyword count, 0-100
    pub relevance: u32,

    /// Similarity score, 0-100, when one was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<u32>,

    /// Last-modified time formatted as `dd/MM/yyyy HH:mm`
    pub updated: String,
}

/// Column a read is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    /// Match count, ties ordered by last-modified
    #[default]
    Relevance,
    /// Last-modified, ties ordered by match count
    Date,
}

/// Sort column plus direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: SortColumn,
    pub ascending: bool,
}

impl SortOrder {
    #[must_use]
    pub fn new(column: SortColumn, ascending: bool) -> Self {
        Self { column, ascending }
    }
}

/// Extension and tag filters attached to a search
///
/// Extensions are stored normalised: no leading dot, lower-case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    extensions: BTreeSet<String>,
    tags: BTreeSet<String>,
}

impl SearchFilters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for ext in extensions {
            self.add_extension(ext.as_ref());
        }
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.add_tag(tag);
        }
        self
    }

    /// Returns false if the extension normalises to nothing
    pub fn add_extension(&mut self, ext: &str) -> bool {
        let ext = normalize_extension(ext);
        if ext.is_empty() {
            return false;
        }
        self.extensions.insert(ext);
        true
    }

    pub fn remove_extension(&mut self, ext: &str) -> bool {
        self.extensions.remove(&normalize_extension(ext))
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return false;
        }
        self.tags.insert(tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    #[must_use]
    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    #[must_use]
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&normalize_extension(ext))
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.tags.is_empty()
    }
}

/// Strip a leading dot and lower-case
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Normalised extension of a path, empty when there is none
#[must_use]
pub fn path_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_normalization() {
        let filters = SearchFilters::new().with_extensions([".PDF", "txt", " .md "]);

        assert!(filters.has_extension("pdf"));
        assert!(filters.has_extension(".pdf"));
        assert!(filters.has_extension("TXT"));
        assert!(filters.has_extension("md"));
        assert_eq!(filters.extensions().len(), 3);
    }

    #[test]
    fn test_blank_filters_are_rejected() {
        let mut filters = SearchFilters::new();
        assert!(!filters.add_extension("."));
        assert!(!filters.add_tag("  "));
        assert!(filters.is_empty());
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(path_extension("/docs/A.PDF"), "pdf");
        assert_eq!(path_extension("/docs/archive.tar.gz"), "gz");
        assert_eq!(path_extension("/docs/Makefile"), "");
    }
}
