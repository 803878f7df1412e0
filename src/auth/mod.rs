//! WebSocket authorization.
//!
//! The update channel is token-authenticated: before opening the socket the
//! client exchanges its session cookie for a short-lived access token, then
//! passes the token as a query parameter on the socket URL. One token fetch
//! per connection attempt.

pub mod token;

pub use token::{socket_url, AuthError, TokenClient};
