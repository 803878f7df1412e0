//! Wire protocol for the dashboard update channel.
//!
//! The backend exposes a JSON-over-WebSocket protocol for keeping the admin
//! dashboard in sync without polling.
//!
//! # Protocol
//!
//! ```text
//! Client                           Backend
//!   |                                |
//!   |-- {type, payload} ------------>|   get_dashboard_state
//!   |                                |
//!   |<-- {type, data} ---------------|   initial_dashboard_state,
//!   |<-- {type, data} ---------------|   dashboard_state_update,
//!   |<-- {type, data} ---------------|   transcription_updated,
//!   |<-- {type, data} ---------------|   worker_stats, ...
//!   |<-- {type, message} ------------|   error
//!   |                                |
//! ```
//!
//! Client frames are `{ "type": ..., "payload": ... }`; server frames are
//! `{ "type": ..., "data": ... }`, or `{ "type": "error", "message": ... }`
//! for server-reported errors. Older backend revisions used different type
//! tags for the same frames; those are accepted as aliases on input.

pub mod message;
pub mod types;

pub use message::{ClientMessage, ServerMessage, StateRequest};
pub use types::{
    DashboardState, Transcription, TranscriptionCount, TranscriptionPatch, WorkerHealth,
    WorkerInfo, WorkerStats,
};
