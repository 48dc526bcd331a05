//! Token grants returned by Google's token endpoint.

use serde::Deserialize;

/// An access token minted by the token endpoint, with the refresh token if
/// the endpoint returned one.
///
/// Google keeps the same refresh token across refreshes unless it is
/// revoked, so `refresh_token` is usually `None` after a refresh and only
/// set after the authorization-code exchange.
#[derive(Clone, PartialEq)]
pub struct TokenGrant {
    /// The OAuth access token for API requests.
    pub access_token: String,

    /// The refresh token, when the endpoint issued one.
    pub refresh_token: Option<String>,

    /// Unix timestamp when the access token expires, if known.
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenGrant {
    /// Create a grant expiring `expires_in` seconds from now.
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: Option<i64>) -> Self {
        let expires_at = expires_in.map(|ei| chrono::Utc::now().timestamp() + ei);
        Self::with_expires_at(access_token, refresh_token, expires_at)
    }

    /// Create a grant with a specific expiration timestamp.
    pub fn with_expires_at(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<i64>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Seconds until expiry, clamped at zero. `None` when no expiry is known.
    pub fn expires_in_secs(&self) -> Option<i64> {
        self.expires_at
            .map(|exp| (exp - chrono::Utc::now().timestamp()).max(0))
    }

    /// Cookie lifetime for this access token: the configured ceiling, or the
    /// token's own remaining lifetime if that is shorter.
    pub fn cookie_max_age(&self, ceiling_secs: i64) -> i64 {
        match self.expires_in_secs() {
            Some(remaining) => remaining.min(ceiling_secs),
            None => ceiling_secs,
        }
    }
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl From<TokenResponse> for TokenGrant {
    fn from(resp: TokenResponse) -> Self {
        TokenGrant::new(resp.access_token, resp.refresh_token, resp.expires_in)
    }
}

/// Error response from Google's token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
