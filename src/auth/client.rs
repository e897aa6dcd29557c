//! OAuth2 client: token acquisition, refresh, persistence, and the
//! serialized outbound request path.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

use crate::config::OAuthConfig;

use super::token::{Token, TokenResponse};

/// Connect timeout applied to every outbound request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall request timeout applied to every outbound request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A token expiring within this many seconds is refreshed before use.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Default Accept header for API requests.
const DEFAULT_ACCEPT: &str = "application/json;charset=utf-8";

/// Length of the random anti-forgery `state` parameter.
const STATE_LEN: usize = 24;

/// Errors that can occur in the authorization flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Redirect carried a `state` that does not match the issued one.
    #[error("state parameter does not match the issued authorization request")]
    StateMismatch,

    /// Redirect query is missing the authorization code.
    #[error("redirect query is missing the code parameter")]
    MissingCode,

    /// No token present; the authorization flow has not completed.
    #[error("no token available; complete the authorization flow first")]
    Unauthorized,

    /// Token endpoint rejected the exchange or refresh.
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configured endpoint URL is invalid.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Token state file could not be read or written.
    #[error("token state i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Token state file could not be (de)serialized.
    #[error("token state serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Mutable token state, guarded by one mutex.
///
/// The mutex is held for the full duration of any outbound request so
/// that a refresh can never interleave with a concurrent read of the
/// token.
struct AuthState {
    token: Token,
    /// `state` parameter of the most recently issued authorization URL.
    pending_state: Option<String>,
}

/// OAuth2 token manager and authenticated HTTP client.
///
/// All API requests go through [`OAuthClient::get`], which refreshes an
/// expired token under the same lock before performing the call.
pub struct OAuthClient {
    http: reqwest::Client,
    cfg: OAuthConfig,
    authorize_url: Url,
    state: Mutex<AuthState>,
}

impl OAuthClient {
    /// Create a client and restore the persisted token, if any.
    ///
    /// A missing or unreadable state file leaves the client
    /// unauthorized; it is never a fatal error.
    pub fn new(cfg: OAuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let authorize_url = Url::parse(&cfg.authorize_url)?;

        let token = match Self::restore(&cfg.state_path) {
            Ok(token) => {
                tracing::info!(path = %cfg.state_path.display(), "restored persisted token");
                token
            }
            Err(e) => {
                tracing::warn!(
                    path = %cfg.state_path.display(),
                    error = %e,
                    "could not restore persisted token, starting unauthorized"
                );
                Token::default()
            }
        };

        Ok(Self {
            http,
            cfg,
            authorize_url,
            state: Mutex::new(AuthState {
                token,
                pending_state: None,
            }),
        })
    }

    /// True iff a non-empty token is present. Optimistic: a later
    /// refresh may still fail.
    pub async fn authorized(&self) -> bool {
        !self.state.lock().await.token.is_empty()
    }

    /// Build the provider's authorization-code URL.
    ///
    /// Generates a fresh random `state` parameter and remembers it for
    /// verification during [`fetch_token`](Self::fetch_token).
    pub async fn authorization_url(&self) -> String {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.cfg.client_id)
            .append_pair("redirect_uri", &self.cfg.redirect_uri)
            .append_pair("scope", &self.cfg.scopes.join(" "))
            .append_pair("state", &nonce);

        self.state.lock().await.pending_state = Some(nonce);
        url.into()
    }

    /// Exchange an authorization code for a token.
    ///
    /// `params` are the query parameters of the provider redirect. A
    /// `state` parameter that differs from the one issued with the
    /// authorization URL fails with [`AuthError::StateMismatch`] and
    /// leaves the stored token untouched. On success the token is
    /// stored and persisted; a persistence failure is logged, not
    /// raised.
    pub async fn fetch_token(&self, params: &HashMap<String, String>) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;

        if let Some(got) = params.get("state") {
            if state.pending_state.as_deref() != Some(got.as_str()) {
                return Err(AuthError::StateMismatch);
            }
        }
        let code = params.get("code").ok_or(AuthError::MissingCode)?;

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.cfg.redirect_uri.as_str()),
            ("client_id", self.cfg.client_id.as_str()),
            ("client_secret", self.cfg.client_secret.as_str()),
        ];
        let token = self.token_request(&form, &state.token).await?;

        state.pending_state = None;
        self.store(&mut state, token).await;
        tracing::info!("authorization code exchanged for token");
        Ok(())
    }

    /// Perform an authenticated GET.
    ///
    /// This is the single choke point for outbound API calls: the token
    /// lock is held across expiry check, refresh, and the request
    /// itself, so overlapping calls are serialized and never observe a
    /// half-refreshed token.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, AuthError> {
        let mut state = self.state.lock().await;

        if state.token.is_empty() {
            return Err(AuthError::Unauthorized);
        }
        if state.token.is_expired(EXPIRY_LEEWAY_SECS) {
            self.refresh_locked(&mut state).await?;
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(&state.token.access_token)
            .header(header::ACCEPT, DEFAULT_ACCEPT)
            .send()
            .await?;
        Ok(response)
    }

    /// Refresh the token with the stored refresh token. Called with the
    /// state lock held.
    async fn refresh_locked(&self, state: &mut AuthState) -> Result<(), AuthError> {
        tracing::debug!("access token expired, refreshing");
        let refresh_token = state.token.refresh_token.clone();
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.cfg.client_id.as_str()),
            ("client_secret", self.cfg.client_secret.as_str()),
        ];
        let token = self.token_request(&form, &state.token).await?;
        self.store(state, token).await;
        Ok(())
    }

    /// POST a grant to the token endpoint and parse the response.
    async fn token_request(
        &self,
        form: &[(&str, &str)],
        previous: &Token,
    ) -> Result<Token, AuthError> {
        let response = self
            .http
            .post(&self.cfg.token_url)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint { status, body });
        }
        let wire: TokenResponse = response.json().await?;
        Ok(wire.into_token(previous))
    }

    /// Store a new token and persist it. Persistence failures are
    /// logged; the in-memory token is kept regardless.
    async fn store(&self, state: &mut AuthState, token: Token) {
        state.token = token;
        if let Err(e) = self.persist(&state.token).await {
            tracing::error!(
                path = %self.cfg.state_path.display(),
                error = %e,
                "failed to persist token"
            );
        }
    }

    async fn persist(&self, token: &Token) -> Result<(), AuthError> {
        let data = serde_json::to_vec_pretty(token)?;
        tokio::fs::write(&self.cfg.state_path, data).await?;
        Ok(())
    }

    fn restore(path: &Path) -> Result<Token, AuthError> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.cfg.client_id)
            .field("token_url", &self.cfg.token_url)
            .finish_non_exhaustive()
    }
}
