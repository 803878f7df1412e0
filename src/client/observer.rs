//! Observer seam between the sync client and whatever renders its data.
//!
//! The transport knows nothing about rendering; everything it learns is
//! handed to a [`DashboardObserver`]. Callbacks run on the connection task,
//! so a slow observer delays subsequent frame processing.

use async_trait::async_trait;

use crate::protocol::{DashboardState, Transcription, WorkerStats};

use super::error::SyncError;
use super::ConnectionState;

/// Receiver for everything the sync client observes on the update channel.
///
/// All methods default to no-ops so implementors only handle what they care
/// about.
#[async_trait]
pub trait DashboardObserver: Send + Sync {
    /// The connection state machine moved to a new state.
    async fn on_connection_state(&self, state: ConnectionState) {
        let _ = state;
    }

    /// A full dashboard state frame arrived (initial or update).
    async fn on_full_state(&self, state: &DashboardState) {
        let _ = state;
    }

    /// One transcription changed; patch it in place.
    async fn on_transcription_updated(&self, transcription: &Transcription) {
        let _ = transcription;
    }

    /// Worker fleet status changed, nothing else.
    async fn on_worker_stats(&self, stats: &WorkerStats) {
        let _ = stats;
    }

    /// The backend signalled a change; re-request state with current filters.
    async fn on_refresh_needed(&self) {}

    /// The server reported an application error; no state change implied.
    async fn on_server_error(&self, message: &str) {
        let _ = message;
    }

    /// A client-side failure (auth, transport, reconnect exhaustion).
    async fn on_error(&self, error: &SyncError) {
        let _ = error;
    }

    /// The session is invalid; the user must log in again before the client
    /// can reconnect.
    async fn on_auth_required(&self) {}
}

/// Observer that ignores everything. Useful for tests and headless callers
/// that only use the request/response API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

#[async_trait]
impl DashboardObserver for NullObserver {}
