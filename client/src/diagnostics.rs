//! Shared URI → diagnostics mapping bridging the reader task and the driver.
//!
//! The reader task publishes; the driver waits. "Never published" and
//! "published empty" are distinct: only the former keeps a waiter parked.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::SessionError;
use crate::types::Diagnostic;

#[derive(Debug, Default)]
struct State {
    published: HashMap<String, Vec<Diagnostic>>,
    closed: Option<SessionError>,
}

/// Latest published diagnostics per document URI.
///
/// Each publish replaces the previous snapshot wholesale; earlier
/// publishes for the same URI are never separately observable.
#[derive(Debug, Default)]
pub struct DiagnosticsStore {
    state: Mutex<State>,
    notify: Notify,
}

impl DiagnosticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the snapshot for `uri`. An empty list is stored as a
    /// snapshot in its own right, not treated as a removal.
    pub fn publish(&self, uri: impl Into<String>, items: Vec<Diagnostic>) {
        self.lock().published.insert(uri.into(), items);
        self.notify.notify_waiters();
    }

    /// The current snapshot for `uri`, if one has ever been published.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<Vec<Diagnostic>> {
        self.lock().published.get(uri).cloned()
    }

    /// Why the store was closed, if it was.
    #[must_use]
    pub fn closed_reason(&self) -> Option<SessionError> {
        self.lock().closed.clone()
    }

    /// Mark the session dead and wake every waiter with `reason`.
    pub(crate) fn close(&self, reason: SessionError) {
        let mut state = self.lock();
        if state.closed.is_none() {
            state.closed = Some(reason);
        }
        drop(state);
        self.notify.notify_waiters();
    }

    /// Wait until a snapshot exists for `uri`, then return it.
    ///
    /// Returns immediately if one is already present (including an empty
    /// one). Fails instead of waiting forever once the store is closed.
    /// There is deliberately no deadline here; the caller supplies one by
    /// wrapping this future when bounded waiting is wanted.
    pub async fn wait_for(&self, uri: &str) -> Result<Vec<Diagnostic>, SessionError> {
        loop {
            // Register for wakeups before checking, so a publish between
            // the check and the await is not lost.
            let notified = self.notify.notified();
            {
                let state = self.lock();
                if let Some(items) = state.published.get(uri) {
                    return Ok(items.clone());
                }
                if let Some(reason) = &state.closed {
                    return Err(reason.clone());
                }
            }
            notified.await;
        }
    }
}
