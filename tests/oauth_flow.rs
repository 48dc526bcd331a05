//! OAuth start, callback, logout and status routes.

mod common;

use axum::body::Body;
use axum::http::{StatusCode, header};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn location(response: &axum::http::Response<Body>) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn start_redirects_to_consent_screen() {
    let server = MockServer::start().await;

    let response = router(config_for(&server))
        .oneshot(get("/api/auth/google?returnTo=/stores/3", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let target = url::Url::parse(&location(&response)).unwrap();
    assert_eq!(target.host_str(), Some("accounts.google.com"));
    assert!(target.query_pairs().any(|(k, v)| k == "prompt" && v == "consent"));
    assert!(target.query_pairs().any(|(k, v)| k == "state" && v == "/stores/3"));
}

#[tokio::test]
async fn start_without_client_is_configuration_error() {
    let response = router(gbp_bridge::config::Config::default())
        .oneshot(get("/api/auth/google", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "configuration_error");
}

#[tokio::test]
async fn callback_stores_both_cookies_and_returns_to_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2Fauth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.new",
            "refresh_token": "1//long-lived",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = router(config_for(&server))
        .oneshot(get(
            "/api/auth/google/callback?code=4%2Fauth-code&state=%2Fstores%2F3",
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/stores/3");

    let cookies = set_cookies(response.headers());
    let access = set_cookie(&cookies, "gbp_access_token").unwrap();
    assert!(access.starts_with("gbp_access_token=ya29.new"));
    assert!(access.contains("SameSite=Lax"));
    let refresh = set_cookie(&cookies, "gbp_refresh_token").unwrap();
    assert!(refresh.contains("Max-Age=2592000"));
    assert!(refresh.contains("HttpOnly"));
}

#[tokio::test]
async fn callback_ignores_external_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.new",
            "expires_in": 3599
        })))
        .mount(&server)
        .await;

    let response = router(config_for(&server))
        .oneshot(get(
            "/api/auth/google/callback?code=abc&state=%2F%2Fevil.example",
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn callback_failure_leaves_cookies_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Malformed auth code."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = router(config_for(&server))
        .oneshot(get("/api/auth/google/callback?code=bad", &[]))
        .await
        .unwrap();

    assert_eq!(location(&response), "/dashboard?gbp_error=token_exchange_failed");
    assert!(set_cookies(response.headers()).is_empty());
}

#[tokio::test]
async fn callback_with_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = router(config_for(&server))
        .oneshot(get("/api/auth/google/callback?error=access_denied", &[]))
        .await
        .unwrap();

    assert_eq!(location(&response), "/dashboard?gbp_error=access_denied");
}

#[tokio::test]
async fn logout_clears_both_cookies() {
    let server = MockServer::start().await;

    let response = router(config_for(&server))
        .oneshot(request(
            "POST",
            "/api/auth/google/logout",
            &[("gbp_access_token", "ya29.a"), ("gbp_refresh_token", "1//r")],
            Body::empty(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookies = set_cookies(response.headers());
    assert!(is_removal(set_cookie(&cookies, "gbp_access_token").unwrap()));
    assert!(is_removal(set_cookie(&cookies, "gbp_refresh_token").unwrap()));
}

#[tokio::test]
async fn status_reports_credentials_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = router(config_with_service_account(&server))
        .oneshot(get("/api/auth/google/status", &[("gbp_refresh_token", "1//r")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["oauthConfigured"], true);
    assert_eq!(json["hasAccessToken"], false);
    assert_eq!(json["hasRefreshToken"], true);
    assert_eq!(json["serviceAccountConfigured"], true);
    assert_eq!(json["serviceAccountEmail"], SERVICE_ACCOUNT_EMAIL);
}

#[tokio::test]
async fn health_is_ok() {
    let server = MockServer::start().await;
    let response = router(config_for(&server))
        .oneshot(get("/health", &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
