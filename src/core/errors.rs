use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

/// Errors surfaced by HTTP handlers.
///
/// Responses carry no body: failure details are logged, never returned to the
/// channel that delivered the activity.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            ApiError::Internal(msg) => tracing::error!("Request failed: {}", msg),
            other => tracing::warn!("Request rejected: {}", other),
        }
        self.status().into_response()
    }
}
