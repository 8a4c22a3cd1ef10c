use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

/// Procurement overview: order counts per state and committed spend.
/// The spend figure sums order totals; it is not a stock valuation.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/summary",
    responses((status = 200, description = "Dashboard summary")),
    tag = "dashboard"
)]
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .inventory
        .dashboard_summary()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/summary", get(summary))
}
