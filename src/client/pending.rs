//! Pending request correlation.
//!
//! The wire protocol carries no response correlation id: any full-state
//! frame satisfies every outstanding `get_dashboard_state` request. The map
//! here still keys entries by a generated id so individual requests can be
//! timed out or cancelled without disturbing the others, and so identical
//! concurrent requests can share one wire frame (single-flight).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::protocol::{DashboardState, StateRequest};

/// Handle to one waiter's slot in the pending map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterId {
    entry: Uuid,
    waiter: Uuid,
}

struct Entry {
    request: StateRequest,
    waiters: Vec<(Uuid, oneshot::Sender<DashboardState>)>,
}

/// Map of in-flight state requests.
#[derive(Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<Uuid, Entry>>,
}

impl PendingRequests {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for the given request parameters.
    ///
    /// If an entry with identical parameters is already in flight, the
    /// waiter attaches to it and no new wire frame should be sent; the
    /// returned flag says whether this call created a fresh entry.
    pub fn subscribe(
        &self,
        request: &StateRequest,
    ) -> (WaiterId, oneshot::Receiver<DashboardState>, bool) {
        let (tx, rx) = oneshot::channel();
        let waiter = Uuid::new_v4();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((entry_id, entry)) = inner
            .iter_mut()
            .find(|(_, entry)| entry.request == *request)
        {
            entry.waiters.push((waiter, tx));
            return (
                WaiterId {
                    entry: *entry_id,
                    waiter,
                },
                rx,
                false,
            );
        }

        let entry_id = Uuid::new_v4();
        inner.insert(
            entry_id,
            Entry {
                request: request.clone(),
                waiters: vec![(waiter, tx)],
            },
        );
        (
            WaiterId {
                entry: entry_id,
                waiter,
            },
            rx,
            true,
        )
    }

    /// Resolve every pending waiter with a copy of the given state.
    ///
    /// Returns the number of waiters resolved.
    pub fn resolve_all(&self, state: &DashboardState) -> usize {
        let entries: Vec<Entry> = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.drain().map(|(_, entry)| entry).collect()
        };

        let mut resolved = 0;
        for entry in entries {
            for (_, tx) in entry.waiters {
                if tx.send(state.clone()).is_ok() {
                    resolved += 1;
                }
            }
        }
        resolved
    }

    /// Remove one waiter after timeout or cancellation.
    ///
    /// Entries left with no waiters are dropped entirely so a later request
    /// with the same parameters starts fresh instead of attaching to a slot
    /// nobody is listening on.
    pub fn remove_waiter(&self, id: WaiterId) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner.get_mut(&id.entry) {
            entry.waiters.retain(|(waiter, _)| *waiter != id.waiter);
            if entry.waiters.is_empty() {
                inner.remove(&id.entry);
            }
        }
    }

    /// Drop every entry, failing all waiters. Used on client shutdown.
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of in-flight entries (not waiters).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no request is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
