use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::locations::{CreateLocation, UpdateLocation},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    pub description: Option<String>,
    pub capacity_volume: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLocationRequest {
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Manual capacity correction, e.g. after a physical recount.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VolumeRequest {
    pub volume: Decimal,
}

/// Create a warehouse location
#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Location created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let location = state
        .services
        .locations
        .create_location(CreateLocation {
            code: payload.code,
            description: payload.description,
            capacity_volume: payload.capacity_volume,
        })
        .await
        .map_err(map_service_error)?;

    info!("Warehouse location created: {}", location.id);

    Ok(created_response(location))
}

/// Get a warehouse location by ID
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location id")),
    responses(
        (status = 200, description = "Location"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let location = state
        .services
        .locations
        .get_location(location_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(location))
}

/// List warehouse locations with pagination
#[utoipa::path(
    get,
    path = "/api/v1/locations",
    params(PaginationParams),
    responses((status = 200, description = "Locations page")),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (locations, total) = state
        .services
        .locations
        .list_locations(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        locations,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Update a warehouse location's descriptive fields
#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location id")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Updated location"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let location = state
        .services
        .locations
        .update_location(
            location_id,
            UpdateLocation {
                code: payload.code,
                description: payload.description,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(location))
}

/// Delete a warehouse location
#[utoipa::path(
    delete,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Location still in use", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn delete_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .locations
        .delete_location(location_id)
        .await
        .map_err(map_service_error)?;

    info!("Warehouse location deleted: {}", location_id);

    Ok(no_content_response())
}

/// Allocate volume at a location (manual correction)
#[utoipa::path(
    post,
    path = "/api/v1/locations/{id}/allocate",
    params(("id" = Uuid, Path, description = "Location id")),
    request_body = VolumeRequest,
    responses(
        (status = 200, description = "Updated location"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient capacity", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn allocate_volume(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Json(payload): Json<VolumeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let location = state
        .services
        .capacity
        .allocate(location_id, payload.volume)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(location))
}

/// Release volume at a location (manual correction)
#[utoipa::path(
    post,
    path = "/api/v1/locations/{id}/release",
    params(("id" = Uuid, Path, description = "Location id")),
    request_body = VolumeRequest,
    responses(
        (status = 200, description = "Updated location"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Release exceeds allocated volume", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn release_volume(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Json(payload): Json<VolumeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let location = state
        .services
        .capacity
        .release(location_id, payload.volume)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(location))
}

/// List stock movements recorded at a location
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}/movements",
    params(("id" = Uuid, Path, description = "Location id"), PaginationParams),
    responses(
        (status = 200, description = "Stock movements page"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn list_location_movements(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    // 404 for unknown locations rather than an empty page.
    state
        .services
        .locations
        .get_location(location_id)
        .await
        .map_err(map_service_error)?;

    let (movements, total) = state
        .services
        .inventory
        .list_movements(Some(location_id), pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        movements,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route(
            "/:id",
            get(get_location)
                .put(update_location)
                .delete(delete_location),
        )
        .route("/:id/allocate", post(allocate_volume))
        .route("/:id/release", post(release_volume))
        .route("/:id/movements", get(list_location_movements))
}
