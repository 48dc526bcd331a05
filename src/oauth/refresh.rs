//! Access-token refresh against Google's token endpoint.
//!
//! The interesting part is failure classification: a refresh token that
//! Google reports as revoked or expired is dead for good and the caller
//! should drop it, while every other failure (network, 5xx, odd payloads)
//! is treated as transient and the refresh token is kept.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::GoogleOAuthConfig;
use super::token::{TokenErrorResponse, TokenGrant, TokenResponse};
use crate::gbp::{Error, Result};
use crate::net::HttpClient;

/// Exchanges a refresh token for a fresh access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Returns `Error::InvalidGrant` only when the refresh token is
    /// permanently unusable. Any other error is transient.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// Decide whether a token endpoint error body means the grant is gone.
///
/// Best-effort: Google reports `{"error": "invalid_grant"}` for revoked or
/// expired refresh tokens, but proxies and older endpoints sometimes only
/// carry the text. All matching lives here so the heuristic can change
/// without touching the negotiation logic.
pub fn is_invalid_grant(body: &str) -> bool {
    if let Ok(error) = serde_json::from_str::<TokenErrorResponse>(body) {
        if error.error == "invalid_grant" {
            return true;
        }
    }
    let lower = body.to_lowercase();
    lower.contains("invalid_grant") || lower.contains("token has been expired or revoked")
}

/// [`TokenRefresher`] backed by the OAuth web client's token endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTokenRefresher {
    http: HttpClient,
    config: Arc<GoogleOAuthConfig>,
}

impl GoogleTokenRefresher {
    pub fn new(http: HttpClient, config: Arc<GoogleOAuthConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        debug!("Refreshing Google access token");

        let form_data = [
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .inner()
            .post(&self.config.token_url)
            .form(&form_data)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if is_invalid_grant(&body) {
                let description = serde_json::from_str::<TokenErrorResponse>(&body)
                    .ok()
                    .and_then(|e| e.error_description)
                    .unwrap_or_else(|| "invalid_grant".to_string());
                warn!(status = status.as_u16(), %description, "Refresh token rejected");
                return Err(Error::InvalidGrant(description));
            }
            warn!(status = status.as_u16(), "Token refresh failed");
            return Err(Error::upstream(status.as_u16(), body));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)?;
        debug!(expires_in = ?token_response.expires_in, "Token refresh successful");
        Ok(token_response.into())
    }
}
