//! Error types for configuration loading and search backends

use thiserror::Error;

/// Errors surfaced by the library outside of the search hot path.
///
/// The coordinator itself never returns these from `search()`; a failing
/// keyword query is absorbed as an empty contribution.
#[derive(Debug, Error)]
pub enum DeepFindError {
    /// Filesystem access failed (config file, search root).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`crate::SearchConfig`].
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A keyword could not be turned into a full-text matcher.
    #[error("invalid keyword matcher: {0}")]
    InvalidKeyword(#[from] grep::regex::Error),

    /// A query backend reported a failure for one keyword.
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, DeepFindError>;
