use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppState;
use crate::auth::{Outcome, read_credentials};
use crate::error::AppError;
use crate::gbp::{GbpRequest, PerformanceQuery};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnTo {
    pub return_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationQuery {
    pub read_mask: Option<String>,
    pub return_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationQuery {
    #[serde(default)]
    pub update_mask: String,
    pub return_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    pub page_token: Option<String>,
    pub return_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceParams {
    /// Comma-separated `DailyMetric` names.
    pub metrics: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub comment: String,
}

/// Body sent instead of data when the browser must go through consent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequireAuthResponse {
    pub require_auth: bool,
    pub auth_url: String,
}

// ---------------------------------------------------------------------------
// Shared negotiation path
// ---------------------------------------------------------------------------

/// Negotiate credentials for `request` and render the outcome. Cookie
/// directives are attached to every response, including failures.
async fn negotiate(
    state: &AppState,
    jar: CookieJar,
    return_to: Option<&str>,
    request: GbpRequest,
) -> Response {
    let credentials = read_credentials(&jar);
    let negotiation = state
        .negotiator
        .negotiate(&credentials, &request, return_to)
        .await;
    let jar = state.cookies.apply(jar, &negotiation.cookies);

    let body = match negotiation.outcome {
        Outcome::Served { data, mode } => {
            tracing::debug!(operation = request.operation(), %mode, "GBP request served");
            Json(data).into_response()
        }
        Outcome::RequireAuth { auth_url } => Json(RequireAuthResponse {
            require_auth: true,
            auth_url,
        })
        .into_response(),
        Outcome::Failed(err) => AppError::from(err).into_response(),
    };
    (jar, body).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/gbp/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<ReturnTo>,
    jar: CookieJar,
) -> Response {
    negotiate(&state, jar, params.return_to.as_deref(), GbpRequest::ListAccounts).await
}

/// GET /api/gbp/accounts/{account}/locations
pub async fn list_locations(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Query(params): Query<LocationQuery>,
    jar: CookieJar,
) -> Response {
    let request = GbpRequest::ListLocations {
        account,
        read_mask: params.read_mask,
    };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}

/// GET /api/gbp/locations/{location}
pub async fn get_location(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(params): Query<LocationQuery>,
    jar: CookieJar,
) -> Response {
    let request = GbpRequest::GetLocation {
        location,
        read_mask: params.read_mask,
    };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}

/// PATCH /api/gbp/locations/{location}?updateMask=
pub async fn update_location(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(params): Query<UpdateLocationQuery>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    if params.update_mask.trim().is_empty() {
        return Err(AppError::BadRequest("updateMask is required".to_string()));
    }
    let request = GbpRequest::UpdateLocation {
        location,
        update_mask: params.update_mask,
        body,
    };
    Ok(negotiate(&state, jar, params.return_to.as_deref(), request).await)
}

/// GET /api/gbp/accounts/{account}/locations/{location}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Path((account, location)): Path<(String, String)>,
    Query(params): Query<ReviewsQuery>,
    jar: CookieJar,
) -> Response {
    let request = GbpRequest::ListReviews {
        account,
        location,
        page_token: params.page_token,
    };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}

/// PUT /api/gbp/accounts/{account}/locations/{location}/reviews/{review}/reply
pub async fn reply_to_review(
    State(state): State<AppState>,
    Path((account, location, review)): Path<(String, String, String)>,
    Query(params): Query<ReturnTo>,
    jar: CookieJar,
    Json(body): Json<ReplyRequest>,
) -> Result<Response, AppError> {
    if body.comment.trim().is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".to_string()));
    }
    let request = GbpRequest::ReplyToReview {
        account,
        location,
        review,
        comment: body.comment,
    };
    Ok(negotiate(&state, jar, params.return_to.as_deref(), request).await)
}

/// GET /api/gbp/accounts/{account}/locations/{location}/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Path((account, location)): Path<(String, String)>,
    Query(params): Query<ReturnTo>,
    jar: CookieJar,
) -> Response {
    let request = GbpRequest::ListPosts { account, location };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}

/// POST /api/gbp/accounts/{account}/locations/{location}/posts
pub async fn create_post(
    State(state): State<AppState>,
    Path((account, location)): Path<(String, String)>,
    Query(params): Query<ReturnTo>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> Response {
    let request = GbpRequest::CreatePost {
        account,
        location,
        body,
    };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}

/// DELETE /api/gbp/accounts/{account}/locations/{location}/posts/{post}
pub async fn delete_post(
    State(state): State<AppState>,
    Path((account, location, post)): Path<(String, String, String)>,
    Query(params): Query<ReturnTo>,
    jar: CookieJar,
) -> Response {
    let request = GbpRequest::DeletePost {
        account,
        location,
        post,
    };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}

/// GET /api/gbp/locations/{location}/performance
///
/// Dates are validated before any credential is tried.
pub async fn fetch_performance(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(params): Query<PerformanceParams>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (Some(start_date), Some(end_date)) = (params.start_date.as_deref(), params.end_date.as_deref())
    else {
        return Err(AppError::BadRequest(
            "startDate and endDate are required".to_string(),
        ));
    };
    let metrics = params
        .metrics
        .as_deref()
        .map(|m| m.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let query = PerformanceQuery::new(location, metrics, start_date, end_date)?;

    Ok(negotiate(
        &state,
        jar,
        params.return_to.as_deref(),
        GbpRequest::FetchPerformance(query),
    )
    .await)
}

/// GET /api/gbp/accounts/{account}/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Query(params): Query<ReturnTo>,
    jar: CookieJar,
) -> Response {
    let request = GbpRequest::ListNotifications { account };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}

/// GET /api/gbp/locations/{location}/verifications
pub async fn list_verifications(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(params): Query<ReturnTo>,
    jar: CookieJar,
) -> Response {
    let request = GbpRequest::ListVerifications { location };
    negotiate(&state, jar, params.return_to.as_deref(), request).await
}
