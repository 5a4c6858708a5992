use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use serde_json::Value;

use crate::bot::Activity;
use crate::core::errors::ApiError;
use crate::pipeline::TurnError;
use crate::state::AppState;

/// Inbound activity webhook.
///
/// Rejections happen before the turn starts, so a non-2xx response other
/// than 500 never touches session state. A 500 means the turn aborted before
/// its history was committed.
pub async fn post_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.contains("application/json") {
        return Err(ApiError::UnsupportedMediaType(content_type.to_string()));
    }

    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::UnsupportedMediaType(format!("body is not JSON: {}", e)))?;
    let activity: Activity =
        serde_json::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    state
        .validator
        .validate(auth_header, &activity)
        .await
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    match state.orchestrator.handle(&activity).await {
        Ok(outcome) => {
            tracing::debug!("Activity {:?} handled: {:?}", activity.id, outcome);
            Ok(StatusCode::CREATED)
        }
        Err(TurnError::Activity(err)) => Err(ApiError::BadRequest(err.to_string())),
        Err(err) => Err(ApiError::internal(err)),
    }
}
