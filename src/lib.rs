//! Streaming multi-keyword file search
//!
//! A query is split into keywords, each keyword is searched concurrently
//! against a [`QueryBackend`], and every hit increments a per-path match
//! count. Results stream to the caller as relevance- or date-ordered pages
//! while the search is still running.

pub mod config;
pub mod error;
pub mod search;

pub use config::SearchConfig;
pub use error::{DeepFindError, Result};
pub use search::{
    FileItem, FrequencyStore, FsIndexBackend, MemoryBackend, PageCursor, PageDelivery, Predicate,
    QueryBackend, QueryHit, SearchCoordinator, SearchFilters, SerialDispatcher, SessionState,
    SessionStatus, SortColumn, SortOrder, UiDispatcher,
};
