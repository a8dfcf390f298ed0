//! Session operations (cancel, clear, filters, extension stats)

use super::super::session::SearchSession;
use super::super::types::normalize_extension;
use super::dispatch::UiDispatcher;
use parking_lot::Mutex;
use std::sync::Arc;

type CurrentSession = Mutex<Option<Arc<SearchSession>>>;

/// Cancel the current session and fire its completion
pub(super) fn cancel(current: &CurrentSession, dispatcher: &dyn UiDispatcher) -> bool {
    let Some(session) = current.lock().clone() else {
        return false;
    };

    // Completion already fired
    if session.is_completed() {
        return false;
    }

    let newly_cancelled = session.mark_cancelled();
    session.reset_finished();
    session.complete(dispatcher);

    if newly_cancelled {
        log::info!("Cancelled search session {}", session.id());
    }
    newly_cancelled
}

pub(super) fn clear(current: &CurrentSession) {
    if let Some(session) = current.lock().take() {
        session.discard();
        session.store().clear();
        log::debug!("Cleared search session {}", session.id());
    }
}

pub(super) fn sorted_extensions(current: &CurrentSession) -> Vec<(String, usize)> {
    current
        .lock()
        .as_ref()
        .map(|session| session.sorted_extensions())
        .unwrap_or_default()
}

pub(super) fn set_extension(current: &CurrentSession, ext: &str, enabled: bool) -> bool {
    let Some(session) = current.lock().clone() else {
        return false;
    };

    let ext = normalize_extension(ext);
    if ext.is_empty() {
        return false;
    }
    let mut extensions = session.read_extensions();
    if enabled {
        extensions.insert(ext);
    } else {
        extensions.remove(&ext);
    }
    session.set_read_extensions(extensions);
    true
}
