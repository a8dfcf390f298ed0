//! UI-affine execution context
//!
//! Batch and completion callbacks never run on a worker task. They are posted
//! to a dispatcher that runs jobs one at a time, in posting order, so the
//! presentation layer observes store snapshots from a single logical thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::sync::mpsc;

/// A callback invocation waiting to run on the UI context
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs sequentially on the presentation layer's context
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, job: UiJob);
}

/// Dispatcher backed by one dedicated Tokio task
#[derive(Clone)]
pub struct SerialDispatcher {
    tx: mpsc::UnboundedSender<UiJob>,
}

impl SerialDispatcher {
    /// Start the dispatch task. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<UiJob>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    log::error!("UI callback panicked");
                }
            }
            log::debug!("UI dispatcher stopped");
        });
        Self { tx }
    }
}

impl UiDispatcher for SerialDispatcher {
    fn dispatch(&self, job: UiJob) {
        if self.tx.send(job).is_err() {
            log::warn!("UI dispatcher is gone, dropping callback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_jobs_run_in_posting_order() {
        let dispatcher = SerialDispatcher::spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20 {
            let seen = Arc::clone(&seen);
            dispatcher.dispatch(Box::new(move || seen.lock().push(i)));
        }
        let (done_tx, done_rx) = oneshot::channel();
        dispatcher.dispatch(Box::new(move || {
            let _ = done_tx.send(());
        }));
        done_rx.await.expect("Dispatcher dropped the last job");

        assert_eq!(*seen.lock(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_dispatcher() {
        let dispatcher = SerialDispatcher::spawn();
        dispatcher.dispatch(Box::new(|| panic!("callback failure")));

        let (done_tx, done_rx) = oneshot::channel();
        dispatcher.dispatch(Box::new(move || {
            let _ = done_tx.send(());
        }));
        assert!(done_rx.await.is_ok());
    }
}
