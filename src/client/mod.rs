//! Real-time dashboard synchronization client.
//!
//! Owns the WebSocket connection to the backend's update channel and
//! mediates all traffic on it: outbound frames are queued FIFO while
//! disconnected and flushed on open, inbound frames are dispatched to an
//! injected [`DashboardObserver`], and state requests can be awaited through
//! a correlation map with per-request timeout and cancellation.
//!
//! # Architecture
//!
//! ```text
//! Caller                 DashboardSyncClient            Backend
//!   |                           |                          |
//!   |-- send(frame) ----------->| queue (FIFO)             |
//!   |-- request_state() ------->| pending map              |
//!   |                           |-- token fetch ---------->|  (HTTP)
//!   |                           |-- ws connect + flush --->|  (WS)
//!   |                           |<------ {type, data} -----|
//!   |<- observer callbacks -----|                          |
//!   |<- resolved request -------|                          |
//! ```
//!
//! The connection task reconnects on close with capped exponential backoff;
//! only explicit [`shutdown`](DashboardSyncClient::shutdown), an invalid
//! session, or backoff exhaustion are terminal.

pub mod backoff;
pub mod error;
pub mod observer;
pub mod pending;
pub mod queue;
pub mod sync;

pub use backoff::ReconnectPolicy;
pub use error::SyncError;
pub use observer::{DashboardObserver, NullObserver};
pub use sync::{
    ConnectionState, DashboardSyncClient, RequestOptions, DEFAULT_REQUEST_TIMEOUT,
};
