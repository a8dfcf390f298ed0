//! Per-keyword query capability
//!
//! The coordinator issues one [`KeywordQuery`] per keyword against a
//! [`QueryBackend`] and reads the returned stream until it ends. Backends are
//! expected to fail closed: an error item makes that keyword contribute
//! nothing.

use super::tags::{NoTags, TagLookup};
use super::types::{QueryHit, SearchFilters};
use crate::error::{DeepFindError, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Stream of hits for one keyword, terminated when gathering finishes
pub type HitStream = BoxStream<'static, Result<QueryHit>>;

/// Boolean filter over files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every file
    True,
    /// Case-insensitive full-text match
    Contains(String),
    /// Case-insensitive file name suffix, e.g. `.pdf`
    NameEndsWith(String),
    /// Case-insensitive substring of any user tag
    HasTag(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Full-text clause for `keyword`, AND an OR-group of extension clauses,
    /// AND an OR-group of tag clauses. Empty groups are left out.
    #[must_use]
    pub fn for_keyword(keyword: &str, filters: &SearchFilters) -> Self {
        let mut clauses = vec![Self::Contains(keyword.to_owned())];

        if !filters.extensions().is_empty() {
            clauses.push(Self::any(
                filters
                    .extensions()
                    .iter()
                    .map(|ext| Self::NameEndsWith(format!(".{ext}")))
                    .collect(),
            ));
        }
        if !filters.tags().is_empty() {
            clauses.push(Self::any(
                filters.tags().iter().cloned().map(Self::HasTag).collect(),
            ));
        }

        Self::all(clauses)
    }

    /// AND of `clauses`, collapsed when there are fewer than two
    #[must_use]
    pub fn all(mut clauses: Vec<Self>) -> Self {
        match clauses.len() {
            0 => Self::True,
            1 => clauses.remove(0),
            _ => Self::And(clauses),
        }
    }

    /// OR of `clauses`, collapsed when there is exactly one
    #[must_use]
    pub fn any(mut clauses: Vec<Self>) -> Self {
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Self::Or(clauses)
        }
    }

    /// Whether evaluating this clause needs the file's content
    #[must_use]
    pub fn needs_content(&self) -> bool {
        match self {
            Self::Contains(_) => true,
            Self::And(children) | Self::Or(children) => children.iter().any(Self::needs_content),
            Self::True | Self::NameEndsWith(_) | Self::HasTag(_) => false,
        }
    }

    /// Every full-text term referenced by this predicate
    #[must_use]
    pub fn content_terms(&self) -> Vec<&str> {
        match self {
            Self::Contains(term) => vec![term.as_str()],
            Self::And(children) | Self::Or(children) => {
                children.iter().flat_map(Self::content_terms).collect()
            }
            Self::True | Self::NameEndsWith(_) | Self::HasTag(_) => Vec::new(),
        }
    }

    /// Evaluate with `leaf` deciding `Contains`, `NameEndsWith` and `HasTag`
    ///
    /// Inside a group, clauses that do not need content run first so a
    /// content read is skipped whenever a cheap clause already decides.
    pub fn evaluate<F>(&self, leaf: &mut F) -> bool
    where
        F: FnMut(&Predicate) -> bool,
    {
        match self {
            Self::True => true,
            Self::And(children) => {
                let (cheap, costly): (Vec<_>, Vec<_>) =
                    children.iter().partition(|child| !child.needs_content());
                cheap.into_iter().all(|child| child.evaluate(&mut *leaf))
                    && costly.into_iter().all(|child| child.evaluate(&mut *leaf))
            }
            Self::Or(children) => {
                let (cheap, costly): (Vec<_>, Vec<_>) =
                    children.iter().partition(|child| !child.needs_content());
                cheap.into_iter().any(|child| child.evaluate(&mut *leaf))
                    || costly.into_iter().any(|child| child.evaluate(&mut *leaf))
            }
            leaf_clause => leaf(leaf_clause),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, children: &[Predicate], op: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "TRUE"),
            Self::Contains(term) => write!(f, "content ~ {term:?}"),
            Self::NameEndsWith(suffix) => write!(f, "name ENDSWITH {suffix:?}"),
            Self::HasTag(tag) => write!(f, "tag ~ {tag:?}"),
            Self::And(children) => write_group(f, children, "AND"),
            Self::Or(children) => write_group(f, children, "OR"),
        }
    }
}

/// File name suffix check used by `NameEndsWith` clauses
#[must_use]
pub fn name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| {
            name.to_string_lossy()
                .to_lowercase()
                .ends_with(&suffix.to_lowercase())
        })
        .unwrap_or(false)
}

/// One keyword's request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordQuery {
    pub keyword: String,
    pub predicate: Predicate,
}

impl KeywordQuery {
    #[must_use]
    pub fn new(keyword: &str, filters: &SearchFilters) -> Self {
        Self {
            keyword: keyword.to_owned(),
            predicate: Predicate::for_keyword(keyword, filters),
        }
    }
}

/// Capability that answers one keyword query with a finite hit stream
///
/// Implementations must be idempotent and side-effect free. Dropping the
/// returned stream tells the backend to stop gathering.
pub trait QueryBackend: Send + Sync {
    fn query(&self, query: &KeywordQuery) -> HitStream;
}

#[derive(Debug, Clone)]
enum Canned {
    Hits(Vec<QueryHit>),
    Fail(String),
    Hang,
}

/// Backend serving fixed hit lists per keyword
///
/// `Contains` clauses match when they name the queried keyword, so the
/// extension and tag clauses of a query still filter the canned hits.
#[derive(Clone)]
pub struct MemoryBackend {
    keywords: HashMap<String, Canned>,
    tags: Arc<dyn TagLookup>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            keywords: HashMap::new(),
            tags: Arc::new(NoTags),
        }
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hits(mut self, keyword: &str, hits: Vec<QueryHit>) -> Self {
        self.keywords
            .insert(keyword.to_lowercase(), Canned::Hits(hits));
        self
    }

    /// The query for `keyword` yields a single error item
    #[must_use]
    pub fn with_failure(mut self, keyword: &str, message: &str) -> Self {
        self.keywords
            .insert(keyword.to_lowercase(), Canned::Fail(message.to_owned()));
        self
    }

    /// The query for `keyword` never finishes
    #[must_use]
    pub fn with_hang(mut self, keyword: &str) -> Self {
        self.keywords.insert(keyword.to_lowercase(), Canned::Hang);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Arc<dyn TagLookup>) -> Self {
        self.tags = tags;
        self
    }
}

impl QueryBackend for MemoryBackend {
    fn query(&self, query: &KeywordQuery) -> HitStream {
        match self.keywords.get(&query.keyword.to_lowercase()) {
            None => stream::empty().boxed(),
            Some(Canned::Hang) => stream::pending().boxed(),
            Some(Canned::Fail(message)) => {
                let error = DeepFindError::Backend(message.clone());
                stream::once(async move { Err(error) }).boxed()
            }
            Some(Canned::Hits(hits)) => {
                let keyword = query.keyword.to_lowercase();
                let matching: Vec<Result<QueryHit>> = hits
                    .iter()
                    .filter(|hit| {
                        let path = Path::new(&hit.path);
                        query.predicate.evaluate(&mut |clause: &Predicate| match clause {
                            Predicate::Contains(term) => term.to_lowercase() == keyword,
                            Predicate::NameEndsWith(suffix) => name_ends_with(path, suffix),
                            Predicate::HasTag(tag) => self.tags.has_tag(path, tag),
                            _ => false,
                        })
                    })
                    .cloned()
                    .map(Ok)
                    .collect();
                stream::iter(matching).boxed()
            }
        }
    }
}
