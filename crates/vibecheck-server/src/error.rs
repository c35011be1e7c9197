use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced by the HTTP API.
///
/// Upstream detail stays in the payload for logging; the `Display`
/// strings are the only text end users ever see.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Caller exceeded the sliding-window rate limit.
    #[error("Too many requests. Wait a minute before trying again.")]
    RateLimited,

    /// No API key configured; operator-facing.
    #[error("AI service not configured. Set AI_API_KEY in the environment.")]
    NotConfigured,

    /// The upstream provider rate limited us.
    #[error("AI service rate limit reached. Try again in a moment.")]
    UpstreamRateLimited,

    /// The upstream provider rejected our credentials.
    #[error("AI service authentication failed. Check API configuration.")]
    UpstreamAuth,

    /// Any other upstream failure (network, 5xx, malformed body).
    #[error("AI service temporarily unavailable. Please try again.")]
    Upstream(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::RateLimited | ServerError::UpstreamRateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ServerError::NotConfigured
            | ServerError::UpstreamAuth
            | ServerError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let ServerError::Upstream(detail) = &self {
            tracing::error!(detail, "upstream AI failure");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
