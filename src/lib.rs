//! Vocalyx Sync - Real-time dashboard synchronization for the Vocalyx
//! transcription service.

pub mod auth;
pub mod client;
pub mod config;
pub mod model;
pub mod protocol;
pub mod render;
