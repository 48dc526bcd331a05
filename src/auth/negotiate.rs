//! Per-request credential negotiation.
//!
//! Each request walks the same ladder until one rung works:
//!
//! 1. the access-token cookie,
//! 2. the refresh-token cookie (refresh, then retry the call once),
//! 3. the configured service account,
//! 4. an OAuth authorization URL for the browser to follow.
//!
//! The result is a [`Negotiation`]: a tagged [`Outcome`] plus the cookie
//! directives the handler must apply whatever the outcome.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::gbp::{AuthMode, Credential, Error, GbpClient, GbpEndpoints, GbpRequest};
use crate::net::HttpClient;
use crate::oauth::{
    GoogleOAuthConfig, ServiceAccountTokens, TokenGrant, TokenRefresher, build_authorize_url,
};

/// Tokens the browser presented with this request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Terminal state of a negotiation.
#[derive(Debug)]
pub enum Outcome {
    /// The provider answered; `mode` says which credential got through.
    Served { data: Value, mode: AuthMode },
    /// Nothing worked; the browser should go through OAuth consent.
    RequireAuth { auth_url: String },
    /// A credential was accepted but the call itself failed, or the
    /// service account failed for a reason other than authorization.
    Failed(Error),
}

/// Cookie changes decided during negotiation.
#[derive(Debug, Default)]
pub struct CookieUpdate {
    /// New access token minted by a refresh.
    pub access_token: Option<TokenGrant>,
    /// The refresh token was permanently rejected.
    pub clear_refresh_token: bool,
}

impl CookieUpdate {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && !self.clear_refresh_token
    }
}

#[derive(Debug)]
pub struct Negotiation {
    pub outcome: Outcome,
    pub cookies: CookieUpdate,
}

impl Negotiation {
    fn new(outcome: Outcome, cookies: CookieUpdate) -> Self {
        Self { outcome, cookies }
    }
}

/// Runs the credential ladder for one [`GbpRequest`].
///
/// Holds only immutable, process-wide pieces; everything request-specific
/// lives on the stack of [`Negotiator::negotiate`].
pub struct Negotiator {
    http: HttpClient,
    endpoints: Arc<GbpEndpoints>,
    refresher: Arc<dyn TokenRefresher>,
    service_account: Option<Arc<dyn ServiceAccountTokens>>,
    oauth: Arc<GoogleOAuthConfig>,
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("endpoints", &self.endpoints)
            .field("service_account", &self.service_account_email())
            .field("oauth", &self.oauth)
            .finish_non_exhaustive()
    }
}

impl Negotiator {
    pub fn new(
        http: HttpClient,
        endpoints: Arc<GbpEndpoints>,
        refresher: Arc<dyn TokenRefresher>,
        service_account: Option<Arc<dyn ServiceAccountTokens>>,
        oauth: Arc<GoogleOAuthConfig>,
    ) -> Self {
        Self {
            http,
            endpoints,
            refresher,
            service_account,
            oauth,
        }
    }

    pub fn has_service_account(&self) -> bool {
        self.service_account.is_some()
    }

    pub fn service_account_email(&self) -> Option<&str> {
        self.service_account.as_deref().map(|sa| sa.client_email())
    }

    /// Authorization URL carrying `return_to` as state when it is a
    /// same-origin path.
    pub fn auth_url(&self, return_to: Option<&str>) -> String {
        build_authorize_url(&self.oauth, return_to)
    }

    fn client(&self, credential: Credential) -> GbpClient {
        GbpClient::new(&self.http, self.endpoints.clone(), credential)
    }

    pub async fn negotiate(
        &self,
        credentials: &StoredCredentials,
        request: &GbpRequest,
        return_to: Option<&str>,
    ) -> Negotiation {
        let operation = request.operation();
        let mut cookies = CookieUpdate::default();

        if let Err(err) = request.validate() {
            debug!(operation, error = %err, "Rejected before negotiation");
            return Negotiation::new(Outcome::Failed(err), cookies);
        }

        // 1. Access token cookie.
        if let Some(token) = credentials.access_token.as_deref() {
            match self.client(Credential::oauth(token)).execute(request).await {
                Ok(data) => {
                    debug!(operation, mode = %AuthMode::OAuth, "Served with access token");
                    return Negotiation::new(
                        Outcome::Served {
                            data,
                            mode: AuthMode::OAuth,
                        },
                        cookies,
                    );
                }
                Err(err) if !falls_through(&err, request) => {
                    warn!(operation, error = %err, "Request failed with access token");
                    return Negotiation::new(Outcome::Failed(err), cookies);
                }
                Err(err) => {
                    debug!(operation, error = %err, "Access token not accepted, trying refresh");
                }
            }
        }

        // 2. Refresh token cookie.
        if let Some(refresh_token) = credentials.refresh_token.as_deref() {
            match self.refresher.refresh(refresh_token).await {
                Ok(grant) => {
                    let client = self.client(Credential::oauth(grant.access_token.clone()));
                    cookies.access_token = Some(grant);
                    let outcome = match client.execute(request).await {
                        Ok(data) => {
                            info!(operation, "Served after access token refresh");
                            Outcome::Served {
                                data,
                                mode: AuthMode::OAuth,
                            }
                        }
                        Err(err) => {
                            warn!(operation, error = %err, "Request failed after refresh");
                            Outcome::Failed(err)
                        }
                    };
                    return Negotiation::new(outcome, cookies);
                }
                Err(err) if err.is_invalid_grant() => {
                    warn!(operation, error = %err, "Refresh token is no longer valid, clearing it");
                    cookies.clear_refresh_token = true;
                }
                Err(err) => {
                    warn!(
                        operation,
                        error = %err,
                        transient = err.is_transient(),
                        "Token refresh failed, keeping refresh token"
                    );
                }
            }
        }

        // 3. Service account.
        if let Some(service_account) = &self.service_account {
            let result = match service_account.access_token().await {
                Ok(token) => {
                    self.client(Credential::service_account(token))
                        .execute(request)
                        .await
                }
                Err(err) => Err(err),
            };
            match result {
                Ok(data) => {
                    debug!(operation, mode = %AuthMode::ServiceAccount, "Served with service account");
                    return Negotiation::new(
                        Outcome::Served {
                            data,
                            mode: AuthMode::ServiceAccount,
                        },
                        cookies,
                    );
                }
                Err(err) if err.is_auth_failure() => {
                    warn!(
                        operation,
                        client_email = %service_account.client_email(),
                        error = %err,
                        "Service account not authorized"
                    );
                }
                Err(err) => {
                    warn!(operation, error = %err, "Service account request failed");
                    return Negotiation::new(Outcome::Failed(err), cookies);
                }
            }
        }

        // 4. Send the browser through consent.
        debug!(operation, "No usable credential, requiring OAuth");
        Negotiation::new(
            Outcome::RequireAuth {
                auth_url: self.auth_url(return_to),
            },
            cookies,
        )
    }
}

/// Whether a failure with the access token should move on to the next rung.
///
/// Reads move on after any failure, so a read that gets a 404 or 5xx with
/// a working token still costs one refresh before failing the same way.
/// A write only moves on when the token itself was refused; otherwise the
/// provider may already have applied it. Bad input is normally caught by
/// [`GbpRequest::validate`] before the first rung.
fn falls_through(err: &Error, request: &GbpRequest) -> bool {
    if matches!(err, Error::InvalidRequest(_)) {
        return false;
    }
    !request.is_write() || err.is_auth_failure()
}
