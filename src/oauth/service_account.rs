//! Service-account credentials (JWT bearer grant, RFC 7523).
//!
//! The key is loaded once at startup and never changes afterwards. Each
//! call to [`ServiceAccountTokens::access_token`] signs a fresh assertion
//! and trades it for an access token; nothing is cached, so there is no
//! shared mutable state between requests.

use std::path::Path;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::token::TokenResponse;
use crate::config::ServiceAccountConfig;
use crate::gbp::{Error, Result};
use crate::net::HttpClient;

/// Scope requested for service-account tokens.
pub const SERVICE_ACCOUNT_SCOPE: &str = "https://www.googleapis.com/auth/business.manage";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion. Google caps this at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a Google service-account JSON key that matter here.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a JSON key file's contents.
    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Malformed service account key: {e}")))?;

        if key.key_type != "service_account" {
            return Err(Error::config(format!(
                "Expected key type 'service_account', got '{}'",
                key.key_type
            )));
        }
        if key.client_email.trim().is_empty() {
            return Err(Error::config("Service account key has no client_email"));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(Error::config("Service account key has no PEM private_key"));
        }
        Ok(key)
    }

    /// Read and parse a JSON key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Cannot read service account key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Load the key named by the `[service_account]` section.
    ///
    /// Returns `Ok(None)` when no key is configured. Inline JSON wins over
    /// a path.
    pub fn from_config(config: &ServiceAccountConfig) -> Result<Option<Self>> {
        if let Some(json) = config.key_json.as_deref() {
            return Self::from_json(json).map(Some);
        }
        match config.key_path.as_deref() {
            Some(path) => Self::from_file(path).map(Some),
            None => Ok(None),
        }
    }
}

/// Source of service-account access tokens.
#[async_trait]
pub trait ServiceAccountTokens: Send + Sync {
    /// The service account's email, for status reporting.
    fn client_email(&self) -> &str;

    /// Mint an access token for the Business Profile scope.
    async fn access_token(&self) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

/// Signs JWT assertions with the service-account key and exchanges them at
/// the key's `token_uri`.
pub struct ServiceAccountSigner {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    subject: Option<String>,
    http: HttpClient,
}

impl std::fmt::Debug for ServiceAccountSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountSigner")
            .field("key", &self.key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountSigner {
    /// Fails with `Configuration` if the PEM key cannot be parsed.
    pub fn new(key: ServiceAccountKey, subject: Option<String>, http: HttpClient) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::config(format!("Invalid service account private key: {e}")))?;
        Ok(Self {
            key,
            encoding_key,
            subject,
            http,
        })
    }

    /// Sign an assertion issued at `now` (unix seconds).
    pub fn sign_assertion(&self, now: i64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SERVICE_ACCOUNT_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
            sub: self.subject.as_deref(),
        };
        let header = Header {
            kid: self.key.private_key_id.clone(),
            ..Header::new(Algorithm::RS256)
        };
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| Error::config(format!("Failed to sign service account assertion: {e}")))
    }
}

#[async_trait]
impl ServiceAccountTokens for ServiceAccountSigner {
    fn client_email(&self) -> &str {
        &self.key.client_email
    }

    async fn access_token(&self) -> Result<String> {
        let assertion = self.sign_assertion(chrono::Utc::now().timestamp())?;
        debug!(client_email = %self.key.client_email, "Requesting service account token");

        let form_data = [
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http
            .inner()
            .post(&self.key.token_uri)
            .form(&form_data)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                client_email = %self.key.client_email,
                "Service account token request failed"
            );
            return Err(Error::upstream(status.as_u16(), body));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.access_token)
    }
}
