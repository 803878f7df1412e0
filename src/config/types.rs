//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the dashboard sync client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Dashboard backend hostname.
    pub host: String,
    /// Port of the HTTP surface serving `/auth/get-token`.
    pub http_port: u16,
    /// Port of the WebSocket update channel.
    pub ws_port: u16,
    /// Path of the update channel endpoint.
    pub ws_path: String,
    /// Seconds to wait for a full-state response before giving up.
    pub request_timeout_secs: u64,
    /// Default page size for state requests.
    pub page_limit: u32,
    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_ws_path() -> String {
    "/api/ws/updates".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: 8080,
            ws_port: 8000,
            ws_path: default_ws_path(),
            request_timeout_secs: 10,
            page_limit: 25,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Base URL of the HTTP surface (token endpoint).
    #[must_use]
    pub fn http_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }

    /// Timeout applied to state requests by default.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Reconnection policy for the update channel.
///
/// Delays grow geometrically from `initial_delay_secs` up to
/// `max_delay_secs`; after `max_attempts` consecutive failures the client
/// stops retrying. `max_attempts = 0` retries forever.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            max_delay_secs: 60,
            max_attempts: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.ws_port, 8000);
        assert_eq!(config.ws_path, "/api/ws/updates");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.page_limit, 25);
    }

    #[test]
    fn test_reconnect_defaults() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay_secs, 5);
        assert_eq!(config.max_delay_secs, 60);
        assert_eq!(config.max_attempts, 12);
    }

    #[test]
    fn test_http_base_url() {
        let config = SyncConfig {
            host: "dash.example.com".to_string(),
            http_port: 9090,
            ..Default::default()
        };
        assert_eq!(config.http_base_url(), "http://dash.example.com:9090");
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml_str = r#"
            host = "dash.internal"
            ws_port = 9000

            [reconnect]
            max_attempts = 3
        "#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "dash.internal");
        assert_eq!(config.ws_port, 9000);
        assert_eq!(config.reconnect.max_attempts, 3);
        // Untouched fields keep their defaults.
        assert_eq!(config.ws_path, "/api/ws/updates");
        assert_eq!(config.reconnect.initial_delay_secs, 5);
    }
}
