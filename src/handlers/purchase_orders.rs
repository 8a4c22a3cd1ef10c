use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse,
};
use crate::{
    entities::purchase_orders::PurchaseOrderStatus,
    errors::ApiError,
    handlers::AppState,
    services::purchase_orders::{CreateOrder, NewOrderItem, OrderWithItems},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    /// Human-readable order number, unique when present
    pub code: Option<String>,
    pub supplier_id: Uuid,
    /// Defaults to today when omitted
    pub order_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    /// "Draft" or "Issued"; defaults to Issued
    pub status: Option<PurchaseOrderStatus>,
    pub notes: Option<String>,
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub description: Option<String>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiveItemRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplaceItemsRequest {
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPurchaseOrdersParams {
    pub status: Option<PurchaseOrderStatus>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderResponse {
    pub id: Uuid,
    pub code: Option<String>,
    pub supplier_id: Uuid,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub status: PurchaseOrderStatus,
    pub total_amount: Decimal,
    pub fully_received: bool,
    pub notes: Option<String>,
    pub items: Vec<PurchaseOrderItemResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub ordered_quantity: Decimal,
    pub received_quantity: Decimal,
    pub unit_price: Decimal,
    pub description: Option<String>,
    pub location_id: Option<Uuid>,
}

impl From<OrderWithItems> for PurchaseOrderResponse {
    fn from(snapshot: OrderWithItems) -> Self {
        let OrderWithItems { order, items } = snapshot;
        Self {
            id: order.id,
            code: order.code,
            supplier_id: order.supplier_id,
            order_date: order.order_date,
            expected_date: order.expected_date,
            delivery_date: order.delivery_date,
            status: order.status,
            total_amount: order.total_amount,
            fully_received: order.fully_received,
            notes: order.notes,
            items: items
                .into_iter()
                .map(|item| PurchaseOrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    ordered_quantity: item.ordered_quantity,
                    received_quantity: item.received_quantity,
                    unit_price: item.unit_price,
                    description: item.description,
                    location_id: item.location_id,
                })
                .collect(),
        }
    }
}

fn to_new_items(items: Vec<PurchaseOrderItemRequest>) -> Vec<NewOrderItem> {
    items
        .into_iter()
        .map(|item| NewOrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            description: item.description,
            location_id: item.location_id,
        })
        .collect()
}

// Handler functions

/// Create a new purchase order with its items
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrderResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let snapshot = state
        .services
        .purchase_orders
        .create_order(CreateOrder {
            code: payload.code,
            supplier_id: payload.supplier_id,
            order_date: payload.order_date,
            expected_date: payload.expected_date,
            status: payload.status,
            notes: payload.notes,
            items: to_new_items(payload.items),
        })
        .await
        .map_err(map_service_error)?;

    info!("Purchase order created: {}", snapshot.order.id);

    Ok(created_response(PurchaseOrderResponse::from(snapshot)))
}

/// List purchase orders, optionally filtered by status
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(ListPurchaseOrdersParams),
    responses(
        (status = 200, description = "Purchase orders page")
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(params): Query<ListPurchaseOrdersParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .purchase_orders
        .list_orders(params.status, params.page, params.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        orders,
        params.page,
        params.per_page,
        total,
    )))
}

/// Fetch a purchase order with its items
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order", body = PurchaseOrderResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .services
        .purchase_orders
        .get_order(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PurchaseOrderResponse::from(snapshot)))
}

/// Record a receipt against one item of the order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/items/{item_id}/receive",
    params(
        ("id" = Uuid, Path, description = "Purchase order id"),
        ("item_id" = Uuid, Path, description = "Line item id")
    ),
    request_body = ReceiveItemRequest,
    responses(
        (status = 200, description = "Updated purchase order", body = PurchaseOrderResponse),
        (status = 400, description = "Invalid quantity, over-receipt, or illegal transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient location capacity", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_item(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReceiveItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let snapshot = state
        .services
        .fulfillment
        .receive_item(order_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PurchaseOrderResponse::from(snapshot)))
}

/// Cancel a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Canceled purchase order", body = PurchaseOrderResponse),
        (status = 400, description = "Order already terminal", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .services
        .fulfillment
        .cancel_order(order_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order canceled: {}", order_id);

    Ok(success_response(PurchaseOrderResponse::from(snapshot)))
}

/// Replace the entire item collection of a purchase order
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}/items",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = ReplaceItemsRequest,
    responses(
        (status = 200, description = "Updated purchase order", body = PurchaseOrderResponse),
        (status = 400, description = "Receipts already recorded or invalid items", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn replace_items(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ReplaceItemsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let snapshot = state
        .services
        .fulfillment
        .replace_items(order_id, to_new_items(payload.items))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PurchaseOrderResponse::from(snapshot)))
}

/// Delete a purchase order and its items
#[utoipa::path(
    delete,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .purchase_orders
        .delete_order(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route(
            "/:id",
            get(get_purchase_order).delete(delete_purchase_order),
        )
        .route("/:id/items", put(replace_items))
        .route("/:id/items/:item_id/receive", post(receive_item))
        .route("/:id/cancel", post(cancel_purchase_order))
}
