//! Token state and the provider's wire representation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 token as held in memory and persisted to disk.
///
/// An empty `access_token` means "unauthorized". The expiry is stored as
/// an absolute instant so a restored token stays comparable across
/// process restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub scope: Vec<String>,
}

impl Token {
    /// True when no access token is present.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty()
    }

    /// True when the token expires within `leeway_secs` from now.
    ///
    /// A token without expiry information is treated as not expired; a
    /// failing request will surface the problem instead.
    pub fn is_expired(&self, leeway_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + Duration::seconds(leeway_secs) >= at,
            None => false,
        }
    }
}

/// Token endpoint response as sent by the provider.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Lifetime in seconds, converted to an absolute expiry on receipt.
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Space-separated scope list.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert the wire response into a stored [`Token`].
    ///
    /// Refresh responses may omit `refresh_token` and `scope`; those
    /// fields are carried over from the previous token.
    pub fn into_token(self, previous: &Token) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .unwrap_or_else(|| previous.refresh_token.clone()),
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            scope: self
                .scope
                .map(|s| s.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_else(|| previous.scope.clone()),
        }
    }
}
