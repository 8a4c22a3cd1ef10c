use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::products::{CreateProduct, UpdateProduct},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub length: Option<Decimal>,
    pub weight: Option<Decimal>,
    /// Per-unit storage volume; omit for products without a footprint
    pub volume: Option<Decimal>,
    pub unit: Option<String>,
    pub default_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub volume: Option<Decimal>,
    pub unit: Option<String>,
    pub default_price: Option<Decimal>,
    pub active: Option<bool>,
}

/// Create a new product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .create_product(CreateProduct {
            sku: payload.sku,
            name: payload.name,
            description: payload.description,
            width: payload.width,
            height: payload.height,
            length: payload.length,
            weight: payload.weight,
            volume: payload.volume,
            unit: payload.unit,
            default_price: payload.default_price,
        })
        .await
        .map_err(map_service_error)?;

    info!("Product created: {} ({})", product.id, product.sku);

    Ok(created_response(product))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// List products with pagination
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses((status = 200, description = "Products page")),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (products, total) = state
        .services
        .products
        .list_products(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        products,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .update_product(
            product_id,
            UpdateProduct {
                sku: payload.sku,
                name: payload.name,
                description: payload.description,
                volume: payload.volume,
                unit: payload.unit,
                default_price: payload.default_price,
                active: payload.active,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Product still referenced", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .products
        .delete_product(product_id)
        .await
        .map_err(map_service_error)?;

    info!("Product deleted: {}", product_id);

    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}
