#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, Response, header};
use wiremock::MockServer;

use gbp_bridge::AppState;
use gbp_bridge::api;
use gbp_bridge::config::Config;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");
pub const SERVICE_ACCOUNT_EMAIL: &str = "gbp-sync@local-seo.iam.gserviceaccount.com";

/// Config with every Google endpoint pointed at the mock server.
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.google.client_id = "test-client.apps.googleusercontent.com".to_string();
    config.google.client_secret = "test-secret".to_string();
    config.google.token_url = format!("{}/token", server.uri());
    config.api.account_management_url = server.uri();
    config.api.business_information_url = server.uri();
    config.api.my_business_url = server.uri();
    config.api.performance_url = server.uri();
    config.api.notifications_url = server.uri();
    config.api.verifications_url = server.uri();
    config
}

/// Same as [`config_for`], plus a service account whose token endpoint is
/// `/sa-token` on the mock server.
pub fn config_with_service_account(server: &MockServer) -> Config {
    let mut config = config_for(server);
    config.service_account.key_json = Some(
        serde_json::json!({
            "type": "service_account",
            "private_key_id": "kid-1",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": SERVICE_ACCOUNT_EMAIL,
            "token_uri": format!("{}/sa-token", server.uri()),
        })
        .to_string(),
    );
    config
}

pub fn router(config: Config) -> Router {
    api::build_router(AppState::from_config(config))
}

pub fn get(uri: &str, cookies: &[(&str, &str)]) -> Request<Body> {
    request("GET", uri, cookies, Body::empty())
}

pub fn request(method: &str, uri: &str, cookies: &[(&str, &str)], body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        let cookie_header = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(header::COOKIE, cookie_header);
    }
    builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The Set-Cookie header for `name`, if the response carries one.
pub fn set_cookie<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{name}=");
    cookies.iter().find(|c| c.starts_with(&prefix))
}

pub fn is_removal(cookie: &str) -> bool {
    cookie.contains("Max-Age=0")
}
