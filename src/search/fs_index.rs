//! Filesystem full-text backend
//!
//! Answers a keyword query by walking a root directory (respecting ignore
//! files by default), checking name and tag clauses first and only then
//! running a grep searcher over the file content. Hits are sent through an
//! unbounded channel as they are found; dropping the stream closes the channel
//! and the walk stops at the next entry.

use super::backend::{HitStream, KeywordQuery, Predicate, QueryBackend, name_ends_with};
use super::tags::{NoTags, TagLookup};
use super::types::QueryHit;
use crate::error::Result;
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedSender};
use grep::regex::{RegexMatcher, RegexMatcherBuilder};
use grep::searcher::{BinaryDetection, Searcher, SearcherBuilder, Sink, SinkMatch};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Backend that searches file content under one root
#[derive(Clone)]
pub struct FsIndexBackend {
    root: PathBuf,
    include_hidden: bool,
    no_ignore: bool,
    max_depth: Option<usize>,
    tags: Arc<dyn TagLookup>,
}

impl FsIndexBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_hidden: false,
            no_ignore: false,
            max_depth: None,
            tags: Arc::new(NoTags),
        }
    }

    #[must_use]
    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.include_hidden = yes;
        self
    }

    /// Disable .gitignore/.ignore handling
    #[must_use]
    pub fn no_ignore(mut self, yes: bool) -> Self {
        self.no_ignore = yes;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Arc<dyn TagLookup>) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walker(&self) -> WalkBuilder {
        let mut walker = WalkBuilder::new(&self.root);
        walker
            .hidden(!self.include_hidden)
            .parents(!self.no_ignore)
            .ignore(!self.no_ignore)
            .git_global(!self.no_ignore)
            .git_ignore(!self.no_ignore)
            .git_exclude(!self.no_ignore)
            .max_depth(self.max_depth);
        walker
    }
}

impl QueryBackend for FsIndexBackend {
    /// Must be called from within a Tokio runtime; the walk runs on the
    /// blocking pool.
    fn query(&self, query: &KeywordQuery) -> HitStream {
        let (tx, rx) = mpsc::unbounded();
        let walker = self.walker();
        let tags = Arc::clone(&self.tags);
        let query = query.clone();

        tokio::task::spawn_blocking(move || {
            let found = walk(walker, &query, tags.as_ref(), &tx);
            log::debug!("Keyword '{}' walk finished with {found} hits", query.keyword);
        });

        rx.boxed()
    }
}

/// Case-insensitive literal matcher for one keyword
///
/// # Errors
/// Returns error if the escaped keyword cannot be compiled
pub fn build_matcher(keyword: &str) -> Result<RegexMatcher> {
    let matcher = RegexMatcherBuilder::new()
        .case_insensitive(true)
        .build(&regex::escape(keyword))?;
    Ok(matcher)
}

/// Stops the searcher at the first matching line
struct FirstMatch {
    found: bool,
}

impl Sink for FirstMatch {
    type Error = std::io::Error;

    fn matched(
        &mut self,
        _searcher: &Searcher,
        _mat: &SinkMatch<'_>,
    ) -> std::result::Result<bool, Self::Error> {
        self.found = true;
        Ok(false)
    }
}

fn content_matches(searcher: &mut Searcher, matcher: &RegexMatcher, path: &Path) -> bool {
    let mut sink = FirstMatch { found: false };
    match searcher.search_path(matcher, path, &mut sink) {
        Ok(()) => sink.found,
        Err(e) => {
            log::debug!("Skipping unreadable file {}: {e}", path.display());
            false
        }
    }
}

fn walk(
    walker: WalkBuilder,
    query: &KeywordQuery,
    tags: &dyn TagLookup,
    tx: &UnboundedSender<Result<QueryHit>>,
) -> usize {
    let mut matchers: HashMap<&str, RegexMatcher> = HashMap::new();
    for term in query.predicate.content_terms() {
        match build_matcher(term) {
            Ok(matcher) => {
                matchers.insert(term, matcher);
            }
            Err(e) => {
                log::warn!("Cannot search for keyword '{term}': {e}");
                let _ = tx.unbounded_send(Err(e));
                return 0;
            }
        }
    }

    let mut searcher = SearcherBuilder::new()
        .binary_detection(BinaryDetection::quit(b'\x00'))
        .line_number(false)
        .build();

    let mut found = 0;
    for entry in walker.build() {
        if tx.is_closed() {
            log::debug!("Keyword '{}' query dropped, stopping walk", query.keyword);
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Walk error: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let matched = query.predicate.evaluate(&mut |clause: &Predicate| match clause {
            Predicate::Contains(term) => matchers
                .get(term.as_str())
                .is_some_and(|matcher| content_matches(&mut searcher, matcher, path)),
            Predicate::NameEndsWith(suffix) => name_ends_with(path, suffix),
            Predicate::HasTag(tag) => tags.has_tag(path, tag),
            _ => false,
        });
        if !matched {
            continue;
        }

        let modified = entry
            .metadata()
            .ok()
            .and_then(|meta| meta.modified().ok())
            .unwrap_or_else(SystemTime::now);
        let hit = QueryHit::new(path.to_string_lossy().into_owned(), modified);
        if tx.unbounded_send(Ok(hit)).is_err() {
            break;
        }
        found += 1;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_is_literal_and_case_insensitive() {
        use grep::matcher::Matcher;

        let matcher = build_matcher("a+b").unwrap_or_else(|e| panic!("Failed to build matcher: {e}"));

        assert!(
            matcher
                .is_match(b"total: A+B")
                .unwrap_or_else(|e| panic!("Match check failed: {e}"))
        );
        assert!(
            !matcher
                .is_match(b"aab")
                .unwrap_or_else(|e| panic!("Match check failed: {e}"))
        );
    }
}
