//! Sync client error types.

use std::time::Duration;

use crate::auth::AuthError;

/// Errors surfaced by the dashboard sync client.
///
/// Transport-level failures are recovered internally by the reconnect loop
/// and only reported through the observer; the variants callers see from
/// [`request_dashboard_state`](crate::client::DashboardSyncClient::request_dashboard_state)
/// are the request-scoped ones.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Token acquisition failed; the connect loop stops until the caller
    /// re-authenticates and reconnects.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// WebSocket-level failure. Followed by the reconnect path.
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// No full-state response arrived within the request deadline.
    #[error("No response to state request within {0:?}")]
    RequestTimeout(Duration),

    /// The request's cancellation token fired before a response arrived.
    #[error("State request cancelled")]
    RequestCancelled,

    /// Every reconnection attempt allowed by the policy failed.
    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// The client was shut down while the request was pending.
    #[error("Client shut down")]
    Shutdown,
}
