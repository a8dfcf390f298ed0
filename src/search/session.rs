//! Per-search session state
//!
//! A session is created for every `search()` call and discarded when the next
//! one starts. It owns its result store, its callbacks and the cancellation
//! signal handed to every keyword task.

use super::manager::dispatch::UiDispatcher;
use super::store::FrequencyStore;
use super::types::{FileItem, SearchFilters, SortOrder, path_extension};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

/// Receives `(rows, replace, fraction_complete)` on the UI context
pub type BatchCallback = Arc<dyn Fn(Vec<FileItem>, bool, f64) + Send + Sync>;

/// Fires once per session on the UI context
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    Cancelled,
    Completed,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub id: String,
    pub keywords: Vec<String>,
    pub finished_keywords: usize,
    pub percentage: f64,
    pub state: SessionState,
    pub total_paths: usize,
    pub runtime_ms: u64,
}

/// One user-initiated search
pub struct SearchSession {
    id: String,
    keywords: Vec<String>,
    filters: SearchFilters,
    batch_size: usize,
    read_extensions: RwLock<BTreeSet<String>>,
    sort: Mutex<SortOrder>,
    store: Arc<FrequencyStore>,
    finished: Mutex<usize>,
    completed: AtomicBool,
    cancellation_tx: watch::Sender<bool>,
    extension_counts: Mutex<HashMap<String, usize>>,
    on_batch: BatchCallback,
    on_completion: Mutex<Option<CompletionCallback>>,
    start_time: Instant,
}

impl SearchSession {
    pub fn new(
        keywords: Vec<String>,
        filters: SearchFilters,
        sort: SortOrder,
        batch_size: usize,
        on_batch: BatchCallback,
        on_completion: CompletionCallback,
    ) -> Self {
        let (cancellation_tx, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4().to_string(),
            read_extensions: RwLock::new(filters.extensions().clone()),
            keywords,
            filters,
            batch_size: batch_size.max(1),
            sort: Mutex::new(sort),
            store: Arc::new(FrequencyStore::new()),
            finished: Mutex::new(0),
            completed: AtomicBool::new(false),
            cancellation_tx,
            extension_counts: Mutex::new(HashMap::new()),
            on_batch,
            on_completion: Mutex::new(Some(on_completion)),
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Filters the keyword queries were issued with
    #[must_use]
    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn store(&self) -> &Arc<FrequencyStore> {
        &self.store
    }

    #[must_use]
    pub fn sort(&self) -> SortOrder {
        *self.sort.lock()
    }

    pub fn set_sort(&self, order: SortOrder) {
        *self.sort.lock() = order;
    }

    /// Extensions applied to reads of this session's store
    #[must_use]
    pub fn read_extensions(&self) -> BTreeSet<String> {
        self.read_extensions.read().clone()
    }

    pub fn set_read_extensions(&self, extensions: BTreeSet<String>) {
        *self.read_extensions.write() = extensions;
    }

    /// Read a page with the session's current sort and extension filter
    #[must_use]
    pub fn read_page(&self, start_index: usize, page_size: usize) -> Vec<FileItem> {
        let extensions = self.read_extensions();
        self.store.read(
            start_index,
            self.keywords.len(),
            &extensions,
            self.sort(),
            page_size,
        )
    }

    /// A receiver that observes `cancel`
    #[must_use]
    pub fn subscribe_cancellation(&self) -> watch::Receiver<bool> {
        self.cancellation_tx.subscribe()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancellation_tx.borrow()
    }

    /// Raise the cancellation flag. Returns false if it was already raised.
    pub fn mark_cancelled(&self) -> bool {
        !self.cancellation_tx.send_replace(true)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn finished_keywords(&self) -> usize {
        *self.finished.lock()
    }

    /// Returns the new finished count
    ///
    /// No-op once cancelled. The flag is read under the counter lock, so an
    /// increment never lands after `reset_finished`.
    pub fn increment_finished(&self) -> usize {
        let mut finished = self.finished.lock();
        if !self.is_cancelled() {
            *finished += 1;
        }
        *finished
    }

    pub fn reset_finished(&self) {
        *self.finished.lock() = 0;
    }

    /// Fraction of keyword queries that have finished, 0.0 without keywords
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.keywords.is_empty() {
            0.0
        } else {
            self.finished_keywords() as f64 / self.keywords.len() as f64
        }
    }

    pub fn record_extension(&self, path: &str) {
        let ext = path_extension(path);
        *self.extension_counts.lock().entry(ext).or_default() += 1;
    }

    /// Extensions seen so far, most frequent first
    #[must_use]
    pub fn sorted_extensions(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .extension_counts
            .lock()
            .iter()
            .map(|(ext, count)| (ext.clone(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Read the first page and hand it to the batch callback as a replacement
    ///
    /// Does nothing once the session is cancelled or when the page is empty.
    pub fn push_batch(self: &Arc<Self>, dispatcher: &dyn UiDispatcher) {
        if self.is_cancelled() {
            return;
        }
        let page = self.read_page(0, self.batch_size);
        if page.is_empty() {
            return;
        }
        let percentage = self.percentage();
        let session = Arc::clone(self);
        dispatcher.dispatch(Box::new(move || {
            if session.is_cancelled() {
                return;
            }
            (session.on_batch)(page, true, percentage);
        }));
    }

    /// Deliver rows outside the streaming phase, keeping `replace` as given
    pub fn deliver(&self, rows: Vec<FileItem>, replace: bool, dispatcher: &dyn UiDispatcher) {
        let percentage = self.percentage();
        let on_batch = Arc::clone(&self.on_batch);
        dispatcher.dispatch(Box::new(move || on_batch(rows, replace, percentage)));
    }

    /// Post the completion callback, at most once per session
    pub fn complete(&self, dispatcher: &dyn UiDispatcher) {
        self.completed.store(true, Ordering::Release);
        let Some(on_completion) = self.on_completion.lock().take() else {
            return;
        };
        log::info!(
            "Search session {} completed after {}ms ({} paths)",
            self.id,
            self.start_time.elapsed().as_millis(),
            self.store.len()
        );
        dispatcher.dispatch(on_completion);
    }

    /// Stop a superseded session without firing its completion
    pub fn discard(&self) {
        self.mark_cancelled();
        self.completed.store(true, Ordering::Release);
        if self.on_completion.lock().take().is_some() {
            log::debug!("Search session {} superseded", self.id);
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.is_cancelled() {
            SessionState::Cancelled
        } else if self.is_completed() {
            SessionState::Completed
        } else {
            SessionState::Running
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id.clone(),
            keywords: self.keywords.clone(),
            finished_keywords: self.finished_keywords(),
            percentage: self.percentage(),
            state: self.state(),
            total_paths: self.store.len(),
            runtime_ms: u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
