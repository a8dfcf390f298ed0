//! Pull and push pagination over the session store
//!
//! A sort change invalidates any cursor; callers reload from index 0.

use super::super::session::SearchSession;
use super::super::types::{FileItem, SortOrder};
use super::SearchCoordinator;
use super::dispatch::UiDispatcher;

pub(super) fn next_page(
    session: Option<&SearchSession>,
    last_delivered_index: usize,
    window_size: usize,
    order: SortOrder,
) -> (Vec<FileItem>, usize) {
    let Some(session) = session else {
        return (Vec::new(), last_delivered_index);
    };

    session.set_sort(order);
    let page = session.read_page(last_delivered_index, window_size.max(1));
    let next_index = last_delivered_index + page.len();
    (page, next_index)
}

pub(super) fn drain_remaining(
    session: Option<&SearchSession>,
    dispatcher: &dyn UiDispatcher,
    last_delivered_index: usize,
    replace: bool,
) -> usize {
    let Some(session) = session else {
        return last_delivered_index;
    };

    let batch_size = session.batch_size();
    let rows = session.read_page(last_delivered_index, batch_size);
    let delivered = rows.len();
    // One chunk while the read is capped at batch_size; each push stays bounded either way
    for chunk in rows.chunks(batch_size) {
        session.deliver(chunk.to_vec(), replace, dispatcher);
    }

    log::trace!(
        "Drained {delivered} rows from index {last_delivered_index} in session {}",
        session.id()
    );
    last_delivered_index + delivered
}

/// What a `PageCursor::load_next` call produced
#[derive(Debug, Clone, PartialEq)]
pub enum PageDelivery {
    /// Rows returned directly (search idle)
    Pulled(Vec<FileItem>),
    /// Rows pushed through the batch callback (search still loading)
    Pushed(usize),
    /// Nothing past the cursor
    Exhausted,
}

/// Infinite-scroll cursor over a coordinator's current results
///
/// Pulls pages with `next_page` once the search is idle and drains through the
/// batch callback while it is still loading.
pub struct PageCursor {
    coordinator: SearchCoordinator,
    last_delivered: usize,
    has_more: bool,
    sort: SortOrder,
}

impl PageCursor {
    #[must_use]
    pub fn new(coordinator: SearchCoordinator) -> Self {
        Self {
            coordinator,
            last_delivered: 0,
            has_more: true,
            sort: SortOrder::default(),
        }
    }

    /// Start over for a new search
    pub fn reset(&mut self) {
        self.last_delivered = 0;
        self.has_more = true;
    }

    #[must_use]
    pub fn last_delivered(&self) -> usize {
        self.last_delivered
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    /// Fetch the page after the cursor
    pub fn load_next(&mut self) -> PageDelivery {
        if !self.has_more {
            return PageDelivery::Exhausted;
        }

        if self.coordinator.is_loading() {
            let next_index = self.coordinator.drain_remaining(self.last_delivered, false);
            if next_index == self.last_delivered {
                self.has_more = false;
                return PageDelivery::Exhausted;
            }
            let pushed = next_index - self.last_delivered;
            self.last_delivered = next_index;
            PageDelivery::Pushed(pushed)
        } else {
            let window = self.coordinator.config().window_size;
            let (rows, next_index) = self.coordinator.next_page(
                self.last_delivered,
                window,
                self.sort.column,
                self.sort.ascending,
            );
            if next_index == self.last_delivered {
                self.has_more = false;
                return PageDelivery::Exhausted;
            }
            self.last_delivered = next_index;
            PageDelivery::Pulled(rows)
        }
    }

    /// Re-read from index 0 under a new sort order
    pub fn reload(&mut self, sort: SortOrder) -> Vec<FileItem> {
        self.sort = sort;
        let window = self.coordinator.config().reload_window_size;
        let (rows, next_index) = self
            .coordinator
            .next_page(0, window, sort.column, sort.ascending);
        self.last_delivered = next_index;
        self.has_more = !rows.is_empty();
        rows
    }

    /// Track rows that arrived through the batch callback
    pub fn observe_push(&mut self, len: usize, replace: bool) {
        if replace {
            self.last_delivered = len;
        } else {
            self.last_delivered += len;
        }
        if len > 0 {
            self.has_more = true;
        }
    }
}
