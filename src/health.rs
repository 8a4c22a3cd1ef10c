use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::AppState;

/// Liveness: the process is up and serving.
pub async fn simple_health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "up" })))
}

/// Readiness: the database answers a ping.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "up", "database": "up" })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": err.to_string() })),
        ),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(simple_health_check))
        .route("/health/ready", get(readiness_check))
}
