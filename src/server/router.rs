use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, messages};
use crate::state::AppState;

/// Creates the application router.
///
/// - `POST /api/messages`: channel webhook
/// - `GET /health`: liveness probe
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/messages", post(messages::post_activity))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
