//! OAuth token set owned by the session

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Seconds of clock skew tolerated before a token counts as expired
pub const EXPIRY_SKEW_SECS: i64 = 30;

/// Access/refresh/ID token bundle for one end user
///
/// Callers persist this between requests (it round-trips through serde)
/// and hand it back to [`Session::is_token_valid`](crate::Session::is_token_valid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Unix timestamp (seconds) at which the access token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl TokenSet {
    /// Build a token set from a token endpoint response
    pub(crate) fn from_grant(
        access_token: String,
        refresh_token: Option<String>,
        id_token: Option<String>,
        token_type: Option<String>,
        scope: Option<String>,
        expires_in: Option<u64>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            id_token,
            token_type,
            scope,
            expires_at: expires_in.map(|secs| Utc::now().timestamp() + secs as i64),
        }
    }

    /// Whether the access token has expired as of `now` (unix seconds).
    /// A token without expiry information is treated as expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - EXPIRY_SKEW_SECS <= now,
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}
