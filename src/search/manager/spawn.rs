//! Keyword fan-out and the join that drives completion

use super::super::backend::{KeywordQuery, QueryBackend};
use super::super::session::SearchSession;
use super::dispatch::UiDispatcher;
use super::worker::{WorkerLimits, run_keyword};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Spawn one task per keyword plus a supervisor that joins them
///
/// The supervisor fires the session's completion once every keyword task has
/// ended. If the session is cancelled first it aborts the remaining tasks
/// instead; the cancelling caller owns the completion in that case.
pub(super) fn spawn_search_tasks(
    session: Arc<SearchSession>,
    backend: Arc<dyn QueryBackend>,
    dispatcher: Arc<dyn UiDispatcher>,
    limits: WorkerLimits,
) {
    let mut tasks = JoinSet::new();
    for keyword in session.keywords() {
        let query = KeywordQuery::new(keyword, session.filters());
        tasks.spawn(run_keyword(
            Arc::clone(&session),
            Arc::clone(&backend),
            Arc::clone(&dispatcher),
            query,
            limits,
        ));
    }

    let mut cancellation_rx = session.subscribe_cancellation();
    tokio::spawn(async move {
        loop {
            if *cancellation_rx.borrow_and_update() {
                tasks.abort_all();
                log::debug!("Session {} cancelled, keyword tasks aborted", session.id());
                return;
            }

            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(())) => {}
                    Some(Err(e)) if e.is_panic() => {
                        // A panicked keyword still counts as finished
                        log::error!("Keyword task panicked in session {}", session.id());
                        session.increment_finished();
                    }
                    Some(Err(_cancelled)) => {}
                },
                changed = cancellation_rx.changed() => {
                    if changed.is_err() {
                        tasks.abort_all();
                        return;
                    }
                }
            }
        }

        session.complete(dispatcher.as_ref());
    });
}
