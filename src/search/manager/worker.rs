//! Per-keyword aggregation
//!
//! Each keyword task gathers its query's hits, then folds them into the
//! session store, pushing intermediate batches as it goes.

use super::super::backend::{HitStream, KeywordQuery, QueryBackend};
use super::super::session::SearchSession;
use super::super::types::QueryHit;
use super::dispatch::UiDispatcher;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Limits a keyword task runs under
#[derive(Debug, Clone, Copy)]
pub(super) struct WorkerLimits {
    pub max_results: usize,
    pub update_frequency: usize,
    pub timeout: Option<Duration>,
}

/// Run one keyword query to completion and aggregate it
pub(super) async fn run_keyword(
    session: Arc<SearchSession>,
    backend: Arc<dyn QueryBackend>,
    dispatcher: Arc<dyn UiDispatcher>,
    query: KeywordQuery,
    limits: WorkerLimits,
) {
    log::debug!("Keyword '{}' query: {}", query.keyword, query.predicate);

    // Tuples past the cap are never pulled; dropping the stream stops the backend
    let stream = backend.query(&query).take(limits.max_results).boxed();
    let hits = gather(stream, &query.keyword, limits.timeout).await;

    let aggregated = aggregate(&session, &hits, limits, dispatcher.as_ref());
    if session.is_cancelled() {
        log::debug!(
            "Keyword '{}' stopped by cancellation after {aggregated} increments",
            query.keyword
        );
        return;
    }
    let finished = session.increment_finished();
    log::debug!(
        "Keyword '{}' done: {} hits, {aggregated} aggregated ({finished}/{} keywords)",
        query.keyword,
        hits.len(),
        session.keywords().len()
    );
    session.push_batch(dispatcher.as_ref());
}

/// Collect the whole stream. A failing or timed-out query contributes nothing.
async fn gather(mut stream: HitStream, keyword: &str, timeout: Option<Duration>) -> Vec<QueryHit> {
    let collect = async {
        let mut hits = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(hit) => hits.push(hit),
                Err(e) => {
                    log::warn!("Query for keyword '{keyword}' failed: {e}");
                    return Vec::new();
                }
            }
        }
        hits
    };

    match timeout {
        None => collect.await,
        Some(limit) => match tokio::time::timeout(limit, collect).await {
            Ok(hits) => hits,
            Err(_elapsed) => {
                log::warn!(
                    "Query for keyword '{keyword}' timed out after {}ms",
                    limit.as_millis()
                );
                Vec::new()
            }
        },
    }
}

/// Fold hits into the store, counting each path once for this keyword
///
/// Returns the number of increments made.
fn aggregate(
    session: &Arc<SearchSession>,
    hits: &[QueryHit],
    limits: WorkerLimits,
    dispatcher: &dyn UiDispatcher,
) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut aggregated = 0;

    for (index, hit) in hits.iter().enumerate() {
        if session.is_cancelled() {
            log::debug!("Session {} cancelled, stopping aggregation", session.id());
            break;
        }
        if seen.insert(hit.path.as_str()) {
            session.record_extension(&hit.path);
            session.store().increment(&hit.path, hit.modified, 0.0);
            aggregated += 1;
        }
        if index % limits.update_frequency == 0 {
            session.push_batch(dispatcher);
        }
    }
    aggregated
}
