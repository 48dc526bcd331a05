//! Google OAuth for Business Profile access.
//!
//! Two credential paths feed the API client:
//! - End-user OAuth (authorization code flow, web client with secret). The
//!   resulting access/refresh tokens live in browser cookies.
//! - A service account, signing its own JWT assertions.
//!
//! # Endpoints
//! - Authorization: `https://accounts.google.com/o/oauth2/v2/auth`
//! - Token: `https://oauth2.googleapis.com/token`

pub mod refresh;
pub mod service_account;
pub mod token;

pub use refresh::{GoogleTokenRefresher, TokenRefresher, is_invalid_grant};
pub use service_account::{ServiceAccountKey, ServiceAccountSigner, ServiceAccountTokens};
pub use token::TokenGrant;

use tracing::{debug, warn};

use crate::config::GoogleOAuthSettings;
use crate::gbp::{Error, Result};
use crate::net::HttpClient;
use token::{TokenErrorResponse, TokenResponse};

/// Default authorization URL.
const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Default token URL.
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Business Profile management plus basic identity.
const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/business.manage",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Configuration for the end-user OAuth flow.
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl GoogleOAuthConfig {
    /// Create a config with the default Google endpoints and scopes.
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&GoogleOAuthSettings> for GoogleOAuthConfig {
    fn from(settings: &GoogleOAuthSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            auth_url: settings.auth_url.clone(),
            token_url: settings.token_url.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            scopes: settings.scopes.clone(),
        }
    }
}

/// Accept `candidate` as a post-login redirect target only if it is a
/// same-origin relative path.
///
/// Rejects absolute URLs, scheme-relative `//host` and `/\host` forms,
/// any backslash, and control characters.
pub fn sanitize_return_path(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if !candidate.starts_with('/') || candidate.starts_with("//") {
        return None;
    }
    if candidate.contains('\\') || candidate.chars().any(char::is_control) {
        return None;
    }
    Some(candidate.to_string())
}

/// Build the Google authorization URL.
///
/// Google OAuth requires:
/// - `access_type=offline` to receive a refresh token
/// - `prompt=consent` to force consent screen, ensuring refresh token is returned
///
/// `return_to` becomes the `state` parameter only if it passes
/// [`sanitize_return_path`]; otherwise `state` is omitted.
pub fn build_authorize_url(config: &GoogleOAuthConfig, return_to: Option<&str>) -> String {
    let scopes = config.scopes.join(" ");
    let mut url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        config.auth_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&scopes),
    );

    match return_to.map(|r| (r, sanitize_return_path(r))) {
        Some((_, Some(path))) => {
            url.push_str("&state=");
            url.push_str(&urlencoding::encode(&path));
        }
        Some((rejected, None)) => {
            warn!(return_to = %rejected, "Dropping non-relative return path from OAuth state");
        }
        None => {}
    }

    url
}

/// Exchange an authorization code for tokens.
///
/// Google's token endpoint expects standard form-encoded requests,
/// including the client_secret.
pub async fn exchange_code(
    http: &HttpClient,
    config: &GoogleOAuthConfig,
    code: &str,
) -> Result<TokenGrant> {
    debug!("Exchanging authorization code for Google tokens");

    let form_data = [
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    let response = http
        .inner()
        .post(&config.token_url)
        .form(&form_data)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        if let Ok(error) = serde_json::from_str::<TokenErrorResponse>(&body) {
            warn!(
                error = %error.error,
                description = ?error.error_description,
                "Google token exchange failed"
            );
        }
        return Err(Error::upstream(status.as_u16(), body));
    }

    let token_response: TokenResponse = serde_json::from_str(&body)?;
    if token_response.refresh_token.is_none() {
        warn!("No refresh token in response - ensure access_type=offline and prompt=consent");
    }

    debug!("Google token exchange successful");
    Ok(token_response.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> GoogleOAuthConfig {
        GoogleOAuthConfig::new(
            "test-client",
            "test-secret",
            "http://localhost:8400/api/auth/google/callback",
        )
    }

    fn query_param(url: &str, key: &str) -> Option<String> {
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_build_authorize_url_contains_offline_access() {
        let url = build_authorize_url(&test_config(), None);
        assert_eq!(query_param(&url, "access_type").as_deref(), Some("offline"));
        assert_eq!(query_param(&url, "prompt").as_deref(), Some("consent"));
    }

    #[test]
    fn test_build_authorize_url_contains_standard_params() {
        let url = build_authorize_url(&test_config(), Some("/dashboard"));
        assert!(url.starts_with("https://accounts.google.com/"));
        assert_eq!(query_param(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(query_param(&url, "client_id").as_deref(), Some("test-client"));
        assert_eq!(
            query_param(&url, "redirect_uri").as_deref(),
            Some("http://localhost:8400/api/auth/google/callback")
        );
        let scope = query_param(&url, "scope").unwrap();
        assert!(scope.contains("business.manage"));
        assert!(scope.contains("userinfo.email"));
    }

    #[test]
    fn test_state_decodes_to_return_path() {
        let url = build_authorize_url(&test_config(), Some("/dashboard"));
        assert_eq!(query_param(&url, "state").as_deref(), Some("/dashboard"));

        let url = build_authorize_url(&test_config(), Some("/stores/42?tab=reviews&x=1"));
        assert_eq!(
            query_param(&url, "state").as_deref(),
            Some("/stores/42?tab=reviews&x=1")
        );
    }

    #[test]
    fn test_external_return_path_is_not_propagated() {
        for evil in [
            "https://evil.example",
            "//evil.example/path",
            "/\\evil.example",
            "javascript:alert(1)",
            "evil.example",
        ] {
            let url = build_authorize_url(&test_config(), Some(evil));
            assert!(query_param(&url, "state").is_none(), "state kept for {evil}");
        }
    }

    #[test]
    fn test_sanitize_return_path() {
        assert_eq!(sanitize_return_path("/dashboard").as_deref(), Some("/dashboard"));
        assert_eq!(sanitize_return_path(" /a/b ").as_deref(), Some("/a/b"));
        assert!(sanitize_return_path("").is_none());
        assert!(sanitize_return_path("https://evil.example").is_none());
        assert!(sanitize_return_path("//evil.example").is_none());
        assert!(sanitize_return_path("/ok\\..\\evil").is_none());
        assert!(sanitize_return_path("/line\nbreak").is_none());
    }

    proptest! {
        #[test]
        fn prop_sanitized_paths_stay_same_origin(input in ".*") {
            if let Some(path) = sanitize_return_path(&input) {
                prop_assert!(path.starts_with('/'));
                prop_assert!(!path.starts_with("//"));
                prop_assert!(!path.contains('\\'));
                // Resolving against our own origin never leaves it.
                let base = url::Url::parse("https://dashboard.example/").unwrap();
                let resolved = base.join(&path).unwrap();
                prop_assert_eq!(resolved.host_str(), Some("dashboard.example"));
            }
        }
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.new",
                "refresh_token": "1//long-lived",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = GoogleOAuthConfig {
            token_url: format!("{}/token", server.uri()),
            ..test_config()
        };
        let grant = exchange_code(&HttpClient::new(), &config, "auth-code").await.unwrap();
        assert_eq!(grant.access_token, "ya29.new");
        assert_eq!(grant.refresh_token.as_deref(), Some("1//long-lived"));
    }

    #[tokio::test]
    async fn test_exchange_code_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Malformed auth code."
            })))
            .mount(&server)
            .await;

        let config = GoogleOAuthConfig {
            token_url: format!("{}/token", server.uri()),
            ..test_config()
        };
        let err = exchange_code(&HttpClient::new(), &config, "bad").await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(400));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = GoogleOAuthSettings {
            client_id: "my-client".into(),
            client_secret: "my-secret".into(),
            ..Default::default()
        };
        let config = GoogleOAuthConfig::from(&settings);
        assert_eq!(config.client_id, "my-client");
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert!(!format!("{config:?}").contains("my-secret"));
    }
}
