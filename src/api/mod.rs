pub mod gbp;
pub mod health;
pub mod oauth;

use axum::Router;
use axum::routing::{get, post, put};

use crate::AppState;

/// Build the API router with all endpoint groups.
///
/// Route layout:
/// ```text
/// /health                                                        GET
/// /api/auth/google                                               GET    (redirect to consent)
/// /api/auth/google/callback                                      GET
/// /api/auth/google/logout                                        POST
/// /api/auth/google/status                                        GET
/// /api/gbp/accounts                                              GET
/// /api/gbp/accounts/{account}/locations                          GET
/// /api/gbp/accounts/{account}/locations/{location}/reviews       GET
/// /api/gbp/accounts/{account}/locations/{location}/reviews/{review}/reply  PUT
/// /api/gbp/accounts/{account}/locations/{location}/posts         GET, POST
/// /api/gbp/accounts/{account}/locations/{location}/posts/{post}  DELETE
/// /api/gbp/accounts/{account}/notifications                      GET
/// /api/gbp/locations/{location}                                  GET, PATCH
/// /api/gbp/locations/{location}/performance                      GET
/// /api/gbp/locations/{location}/verifications                    GET
/// ```
pub fn build_api_router() -> Router<AppState> {
    let gbp_routes = Router::new()
        .route("/accounts", get(gbp::list_accounts))
        .route("/accounts/{account}/locations", get(gbp::list_locations))
        .route(
            "/accounts/{account}/locations/{location}/reviews",
            get(gbp::list_reviews),
        )
        .route(
            "/accounts/{account}/locations/{location}/reviews/{review}/reply",
            put(gbp::reply_to_review),
        )
        .route(
            "/accounts/{account}/locations/{location}/posts",
            get(gbp::list_posts).post(gbp::create_post),
        )
        .route(
            "/accounts/{account}/locations/{location}/posts/{post}",
            axum::routing::delete(gbp::delete_post),
        )
        .route(
            "/accounts/{account}/notifications",
            get(gbp::list_notifications),
        )
        .route(
            "/locations/{location}",
            get(gbp::get_location).patch(gbp::update_location),
        )
        .route(
            "/locations/{location}/performance",
            get(gbp::fetch_performance),
        )
        .route(
            "/locations/{location}/verifications",
            get(gbp::list_verifications),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/google", get(oauth::start))
        .route("/api/auth/google/callback", get(oauth::callback))
        .route("/api/auth/google/logout", post(oauth::logout))
        .route("/api/auth/google/status", get(oauth::status))
        .nest("/api/gbp", gbp_routes)
}

/// The API router with state attached, ready to serve or to drive with
/// `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    build_api_router().with_state(state)
}
