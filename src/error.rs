use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::gbp;

/// Error returned by HTTP handlers, rendered as a JSON error body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Google Business Profile request failed: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    r#type: String,
    code: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::BadRequest(_) => "invalid_request_error",
            Self::Upstream(_) => "api_error",
            Self::Configuration(_) => "server_error",
        }
    }

    fn error_code(&self) -> Option<&str> {
        match self {
            Self::Upstream(_) => Some("gbp_request_failed"),
            Self::Configuration(_) => Some("configuration_error"),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                code: self.error_code().map(String::from),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<gbp::Error> for AppError {
    fn from(err: gbp::Error) -> Self {
        match err {
            gbp::Error::InvalidRequest(msg) => Self::BadRequest(msg),
            gbp::Error::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                Self::Configuration(msg)
            }
            other => Self::Upstream(other.to_string()),
        }
    }
}
