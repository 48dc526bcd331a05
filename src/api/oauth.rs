use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::gbp::ReturnTo;
use crate::AppState;
use crate::auth::read_credentials;
use crate::error::AppError;
use crate::oauth::{exchange_code, sanitize_return_path};

/// Where the browser lands after the callback when `state` is absent or unusable.
const DEFAULT_LANDING_PATH: &str = "/dashboard";

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub oauth_configured: bool,
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub service_account_configured: bool,
    pub service_account_email: Option<String>,
}

fn error_redirect(code: &str) -> Redirect {
    Redirect::temporary(&format!(
        "{DEFAULT_LANDING_PATH}?gbp_error={}",
        urlencoding::encode(code)
    ))
}

/// GET /api/auth/google
///
/// Sends the browser to Google's consent screen.
pub async fn start(
    State(state): State<AppState>,
    Query(params): Query<ReturnTo>,
) -> Result<Redirect, AppError> {
    if !state.config.google.is_configured() {
        return Err(AppError::Configuration(
            "Google OAuth client id/secret are not set".to_string(),
        ));
    }
    let url = state.negotiator.auth_url(params.return_to.as_deref());
    Ok(Redirect::temporary(&url))
}

/// GET /api/auth/google/callback
///
/// Exchanges the authorization code, stores both token cookies and returns
/// the browser to the path carried in `state`.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(error) = params.error.as_deref() {
        tracing::warn!(error = %error, "Google OAuth consent was not granted");
        return (jar, error_redirect(error));
    }
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        return (jar, error_redirect("missing_code"));
    };

    match exchange_code(&state.http, &state.oauth, code).await {
        Ok(grant) => {
            tracing::info!(
                has_refresh_token = grant.refresh_token.is_some(),
                "Google Business Profile connected"
            );
            let jar = state.cookies.store_grant(jar, &grant);
            let target = params
                .state
                .as_deref()
                .and_then(sanitize_return_path)
                .unwrap_or_else(|| DEFAULT_LANDING_PATH.to_string());
            (jar, Redirect::temporary(&target))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Authorization code exchange failed");
            (jar, error_redirect("token_exchange_failed"))
        }
    }
}

/// POST /api/auth/google/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    tracing::info!("Google Business Profile disconnected");
    (state.cookies.clear_all(jar), StatusCode::NO_CONTENT)
}

/// GET /api/auth/google/status
///
/// Reports which credentials are present without contacting Google.
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> Json<AuthStatusResponse> {
    let credentials = read_credentials(&jar);
    Json(AuthStatusResponse {
        oauth_configured: state.config.google.is_configured(),
        has_access_token: credentials.access_token.is_some(),
        has_refresh_token: credentials.refresh_token.is_some(),
        service_account_configured: state.negotiator.has_service_account(),
        service_account_email: state.negotiator.service_account_email().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_redirect_encodes_code() {
        let response = error_redirect("access denied").into_response();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()["location"],
            "/dashboard?gbp_error=access%20denied"
        );
    }

    #[test]
    fn test_status_response_shape() {
        let json = serde_json::to_value(AuthStatusResponse {
            oauth_configured: true,
            has_access_token: false,
            has_refresh_token: true,
            service_account_configured: false,
            service_account_email: None,
        })
        .unwrap();
        assert_eq!(json["hasRefreshToken"], true);
        assert_eq!(json["serviceAccountConfigured"], false);
        assert!(json["serviceAccountEmail"].is_null());
    }
}
