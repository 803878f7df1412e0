//! Access token client for the update channel.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Connection timeout for the token request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall timeout for the token request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the cookie-authenticated token endpoint.
const TOKEN_PATH: &str = "/auth/get-token";

/// Errors from token acquisition.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The session is missing or expired; the user must log in again.
    #[error("Token request rejected (HTTP {0}), re-authentication required")]
    Unauthorized(StatusCode),

    /// The token endpoint answered with an unexpected non-auth status.
    #[error("Token request failed: HTTP {0}")]
    RequestFailed(StatusCode),

    /// The token endpoint could not be reached.
    #[error("Token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The base URL could not be combined with the token path.
    #[error("Invalid token endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Whether this failure means the session itself is invalid.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Build the HTTP client used for token requests.
///
/// The cookie store carries the dashboard session cookie the token endpoint
/// authenticates against.
fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .cookie_store(true)
        .build()
}

/// Client for the `/auth/get-token` endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: Client,
    base_url: Url,
}

impl TokenClient {
    /// Create a token client for the given dashboard base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, AuthError> {
        Ok(Self {
            http: build_http_client()?,
            base_url,
        })
    }

    /// The dashboard base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange the session cookie for a short-lived access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] on 401/403 (session invalid),
    /// [`AuthError::RequestFailed`] on other non-success statuses, and
    /// [`AuthError::Transport`] if the endpoint is unreachable or the body
    /// is not the expected JSON.
    pub async fn fetch_token(&self) -> Result<String, AuthError> {
        let url = self.base_url.join(TOKEN_PATH)?;
        tracing::debug!(url = %url, "Fetching update-channel token");

        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Unauthorized(status));
        }
        if !status.is_success() {
            return Err(AuthError::RequestFailed(status));
        }

        let body: TokenResponse = response.json().await?;
        Ok(body.access_token)
    }
}

/// Build the authorized WebSocket URL for the update channel.
///
/// # Errors
///
/// Returns [`url::ParseError`] if host/port/path do not form a valid URL.
pub fn socket_url(host: &str, port: u16, path: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("ws://{host}:{port}"))?;
    url.set_path(path);
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_shape() {
        let url = socket_url("dash.example.com", 8000, "/api/ws/updates", "tok123").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://dash.example.com:8000/api/ws/updates?token=tok123"
        );
    }

    #[test]
    fn socket_url_encodes_token() {
        let url = socket_url("localhost", 8000, "/api/ws/updates", "a b&c").unwrap();
        assert_eq!(url.query(), Some("token=a+b%26c"));
    }

    #[test]
    fn token_client_keeps_base_url() {
        let base = Url::parse("http://localhost:9000").unwrap();
        let client = TokenClient::new(base.clone()).unwrap();
        assert_eq!(client.base_url(), &base);
    }

    #[test]
    fn unauthorized_requires_login() {
        let err = AuthError::Unauthorized(StatusCode::UNAUTHORIZED);
        assert!(err.requires_login());
        assert!(err.to_string().contains("re-authentication"));

        let err = AuthError::RequestFailed(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.requires_login());
    }
}
