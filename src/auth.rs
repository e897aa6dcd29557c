//! OAuth2 Token Lifecycle
//!
//! Owns the provider token: authorization-code exchange, automatic
//! refresh on expiry, JSON-file persistence, and the single serialized
//! choke point for all outbound API requests.
//!
//! # Components
//!
//! - [`Token`]: the stored token (access/refresh token, expiry, scopes)
//! - [`OAuthClient`]: token manager and authenticated HTTP client
//! - [`AuthError`]: error taxonomy for the authorization flow

mod client;
mod token;

pub use client::{AuthError, OAuthClient};
pub use token::Token;
