//! Error types for the Google Business Profile integration.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Upstream error bodies are cut to this many characters before being kept.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Substrings in provider error text that indicate an authorization problem
/// rather than a real failure of the requested operation.
const AUTH_FAILURE_PATTERNS: &[&str] = &[
    "permission_denied",
    "permission denied",
    "does not have permission",
    "unauthenticated",
    "invalid authentication credentials",
    "insufficient authentication scopes",
    "request had invalid authentication",
    "invalid_grant",
    "unauthorized_client",
];

/// Errors that can occur while talking to Google on behalf of a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable credential of any kind is attached.
    #[error("Not authenticated with Google Business Profile")]
    Unauthenticated,

    /// The refresh token was permanently rejected (revoked or expired).
    #[error("Refresh token rejected: {0}")]
    InvalidGrant(String),

    /// The provider answered with a non-2xx status.
    #[error("Upstream error ({status}): {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Transport failure (connect, timeout, TLS, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Service-account or OAuth client configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A provider response could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The caller supplied an unusable parameter.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Create an upstream error, truncating the body for diagnostics.
    pub fn upstream(status: u16, body: impl AsRef<str>) -> Self {
        Error::Upstream {
            status,
            body: truncate_body(body.as_ref()),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create an invalid-request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// Whether this failure means "these credentials are not accepted".
    ///
    /// True for `Unauthenticated`, upstream 401/403, and upstream bodies
    /// matching a known permission pattern.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Error::Unauthenticated => true,
            Error::Upstream { status, body } => {
                *status == 401 || *status == 403 || matches_auth_pattern(body)
            }
            _ => false,
        }
    }

    /// Check if this is an invalid-grant error.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Error::InvalidGrant(_))
    }

    /// Whether retrying later could plausibly succeed (transport failures,
    /// 429 and 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status of an upstream failure, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn matches_auth_pattern(text: &str) -> bool {
    let lower = text.to_lowercase();
    AUTH_FAILURE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Cut a response body to [`MAX_ERROR_BODY_CHARS`] characters.
pub fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
