//! Parallel search coordinator
//!
//! This module provides the main `SearchCoordinator` API for starting,
//! cancelling and paging through multi-keyword searches.

pub mod config;
pub mod dispatch;
mod operations;
mod pagination;
mod spawn;
mod worker;

pub use pagination::{PageCursor, PageDelivery};

use super::backend::QueryBackend;
use super::session::{BatchCallback, CompletionCallback, SearchSession, SessionStatus};
use super::types::{FileItem, SearchFilters, SortColumn, SortOrder};
use crate::config::SearchConfig;
use dispatch::UiDispatcher;
use parking_lot::Mutex;
use std::sync::Arc;
use worker::WorkerLimits;

/// Coordinator for streaming multi-keyword searches
///
/// Holds at most one live session. Starting a search discards the previous
/// one together with its store.
#[derive(Clone)]
pub struct SearchCoordinator {
    backend: Arc<dyn QueryBackend>,
    dispatcher: Arc<dyn UiDispatcher>,
    config: SearchConfig,
    current: Arc<Mutex<Option<Arc<SearchSession>>>>,
}

impl SearchCoordinator {
    /// Create a coordinator over `backend`, delivering callbacks through
    /// `dispatcher`
    #[must_use]
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        dispatcher: Arc<dyn UiDispatcher>,
        config: SearchConfig,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            config: config.sanitized(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Start a search for the whitespace-separated keywords in `query`
    ///
    /// One backend query is issued per keyword, all concurrently. Every
    /// aggregation step may push a fresh first page to `on_batch`
    /// (`replace = true`); `on_completion` fires exactly once, after all
    /// keyword queries end or on `cancel`. A `batch_size` of zero uses the
    /// configured default. Must be called from within a Tokio runtime.
    ///
    /// Returns the new session id.
    pub fn search<B, C>(
        &self,
        query: &str,
        filters: SearchFilters,
        batch_size: usize,
        on_batch: B,
        on_completion: C,
    ) -> String
    where
        B: Fn(Vec<FileItem>, bool, f64) + Send + Sync + 'static,
        C: FnOnce() + Send + 'static,
    {
        let keywords: Vec<String> = query.split_whitespace().map(str::to_owned).collect();
        let batch_size = if batch_size == 0 {
            self.config.batch_size
        } else {
            batch_size
        };

        let on_batch: BatchCallback = Arc::new(on_batch);
        let on_completion: CompletionCallback = Box::new(on_completion);

        let session = {
            let mut current = self.current.lock();
            let sort = current.as_ref().map(|old| old.sort()).unwrap_or_default();
            if let Some(old) = current.take() {
                old.discard();
            }
            let session = Arc::new(SearchSession::new(
                keywords,
                filters,
                sort,
                batch_size,
                on_batch,
                on_completion,
            ));
            *current = Some(Arc::clone(&session));
            session
        };

        log::info!(
            "Starting search session {} with {} keywords {:?}, filters {:?}",
            session.id(),
            session.keywords().len(),
            session.keywords(),
            session.filters()
        );

        let limits = WorkerLimits {
            max_results: self.config.max_results_per_keyword,
            update_frequency: self.config.update_frequency,
            timeout: self.config.query_timeout(),
        };
        spawn::spawn_search_tasks(
            Arc::clone(&session),
            Arc::clone(&self.backend),
            Arc::clone(&self.dispatcher),
            limits,
        );

        session.id().to_owned()
    }

    /// Stop the current search
    ///
    /// Outstanding keyword tasks are aborted, aggregation and pushes stop, and
    /// the completion callback still fires (once). Returns false when there
    /// was nothing running to cancel.
    pub fn cancel(&self) -> bool {
        operations::cancel(&self.current, self.dispatcher.as_ref())
    }

    /// Discard the current session and its results
    pub fn clear(&self) {
        operations::clear(&self.current);
    }

    /// Whether a search is still streaming
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.session().is_some_and(|session| !session.is_completed())
    }

    /// Extensions seen in the current or last search, most frequent first
    #[must_use]
    pub fn sorted_extensions_by_count(&self) -> Vec<String> {
        operations::sorted_extensions(&self.current)
            .into_iter()
            .map(|(ext, _count)| ext)
            .collect()
    }

    /// Toggle an extension in the read filter of the current session
    ///
    /// Affects subsequent reads only; queries already issued keep the filters
    /// they were started with. Returns false without a session.
    pub fn set_extension(&self, ext: &str, enabled: bool) -> bool {
        operations::set_extension(&self.current, ext, enabled)
    }

    #[must_use]
    pub fn status(&self) -> Option<SessionStatus> {
        self.session().map(|session| session.status())
    }

    /// Pull one page starting at `last_delivered_index`
    ///
    /// Stores `sort_column`/`ascending` as the session's sort preference. A
    /// `window_size` of zero uses the configured window. Returns the rows and
    /// the advanced index; an unchanged index means the results are exhausted.
    #[must_use]
    pub fn next_page(
        &self,
        last_delivered_index: usize,
        window_size: usize,
        sort_column: SortColumn,
        ascending: bool,
    ) -> (Vec<FileItem>, usize) {
        let window_size = if window_size == 0 {
            self.config.window_size
        } else {
            window_size
        };
        pagination::next_page(
            self.session().as_deref(),
            last_delivered_index,
            window_size,
            SortOrder::new(sort_column, ascending),
        )
    }

    /// Push what exists past `last_delivered_index` to the batch callback
    ///
    /// Reads one page of the session batch size and delivers it in chunks of
    /// at most that size, each with the given `replace` flag. Returns the new
    /// cumulative index.
    pub fn drain_remaining(&self, last_delivered_index: usize, replace: bool) -> usize {
        pagination::drain_remaining(
            self.session().as_deref(),
            self.dispatcher.as_ref(),
            last_delivered_index,
            replace,
        )
    }

    fn session(&self) -> Option<Arc<SearchSession>> {
        self.current.lock().clone()
    }
}
