//! Client configuration.
//!
//! Settings are read from the first of `.vocalyx-sync.toml` (current
//! directory) or `~/.config/vocalyx-sync/config.toml`; every field has a
//! default so a missing file just means defaults.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader};
pub use types::{ReconnectConfig, SyncConfig};
