pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gbp;
pub mod net;
pub mod oauth;

use std::sync::Arc;

use crate::auth::{CookiePolicy, Negotiator};
use crate::config::Config;
use crate::gbp::GbpEndpoints;
use crate::net::HttpClient;
use crate::oauth::{
    GoogleOAuthConfig, GoogleTokenRefresher, ServiceAccountKey, ServiceAccountSigner,
    ServiceAccountTokens, TokenRefresher,
};

/// Shared application state accessible from all handlers.
///
/// Everything here is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: HttpClient,
    pub oauth: Arc<GoogleOAuthConfig>,
    pub negotiator: Arc<Negotiator>,
    pub cookies: CookiePolicy,
}

impl AppState {
    /// Wire up the OAuth client, the optional service account and the
    /// negotiator from configuration.
    ///
    /// A service-account key that fails to load is logged and skipped; the
    /// service keeps running in OAuth-only mode.
    pub fn from_config(config: Config) -> Self {
        let http = HttpClient::from_config(&config.http);
        let oauth = Arc::new(GoogleOAuthConfig::from(&config.google));
        let endpoints = Arc::new(GbpEndpoints::from(&config.api));
        let refresher: Arc<dyn TokenRefresher> =
            Arc::new(GoogleTokenRefresher::new(http.clone(), oauth.clone()));
        let service_account = load_service_account(&config, &http);

        if !config.google.is_configured() {
            tracing::warn!("Google OAuth client is not configured; end-user sign-in will fail");
        }

        let negotiator = Arc::new(Negotiator::new(
            http.clone(),
            endpoints,
            refresher,
            service_account,
            oauth.clone(),
        ));

        Self {
            cookies: CookiePolicy::from(&config.cookies),
            config: Arc::new(config),
            http,
            oauth,
            negotiator,
        }
    }
}

fn load_service_account(config: &Config, http: &HttpClient) -> Option<Arc<dyn ServiceAccountTokens>> {
    let key = match ServiceAccountKey::from_config(&config.service_account) {
        Ok(Some(key)) => key,
        Ok(None) => {
            tracing::debug!("No service account configured");
            return None;
        }
        Err(err) => {
            tracing::warn!(error = %err, "Service account key not loaded, continuing without it");
            return None;
        }
    };

    let client_email = key.client_email.clone();
    match ServiceAccountSigner::new(key, config.service_account.subject.clone(), http.clone()) {
        Ok(signer) => {
            tracing::info!(client_email = %client_email, "Service account loaded");
            let signer: Arc<dyn ServiceAccountTokens> = Arc::new(signer);
            Some(signer)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Service account key unusable, continuing without it");
            None
        }
    }
}
