use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::suppliers::{CreateSupplier, UpdateSupplier},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub cnpj: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    pub cnpj: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Create a new supplier
#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let supplier = state
        .services
        .suppliers
        .create_supplier(CreateSupplier {
            name: payload.name,
            cnpj: payload.cnpj,
            email: payload.email,
            address: payload.address,
            notes: payload.notes,
        })
        .await
        .map_err(map_service_error)?;

    info!("Supplier created: {}", supplier.id);

    Ok(created_response(supplier))
}

/// Get a supplier by ID
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .get_supplier(supplier_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(supplier))
}

/// List suppliers with pagination
#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    params(PaginationParams),
    responses((status = 200, description = "Suppliers page")),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (suppliers, total) = state
        .services
        .suppliers
        .list_suppliers(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        suppliers,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Update a supplier
#[utoipa::path(
    put,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier id")),
    request_body = UpdateSupplierRequest,
    responses(
        (status = 200, description = "Updated supplier"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let supplier = state
        .services
        .suppliers
        .update_supplier(
            supplier_id,
            UpdateSupplier {
                name: payload.name,
                cnpj: payload.cnpj,
                email: payload.email,
                address: payload.address,
                notes: payload.notes,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(supplier))
}

/// Delete a supplier
#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Supplier still referenced", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .suppliers
        .delete_supplier(supplier_id)
        .await
        .map_err(map_service_error)?;

    info!("Supplier deleted: {}", supplier_id);

    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}
