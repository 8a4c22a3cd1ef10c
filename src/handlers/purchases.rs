//! External "purchases" API surface.
//!
//! Speaks the collapsed PENDING/DELIVERED/CANCELED vocabulary and the
//! camelCase field names of the original frontend contract. The mapping to
//! the internal lifecycle is total and explicit; Draft, Issued, and
//! PartiallyReceived all read as PENDING on the way out.

use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    entities::purchase_orders::{self, PurchaseOrderStatus},
    errors::{ApiError, ServiceError},
    handlers::AppState,
    services::purchase_orders::{CreateOrder, NewOrderItem, OrderWithItems, UpdateOrder},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Status vocabulary exposed to external consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalStatus {
    Pending,
    Delivered,
    Canceled,
}

impl ExternalStatus {
    /// Total mapping from the internal lifecycle. Draft and Issued collapse
    /// to Pending intentionally, as does PartiallyReceived.
    pub fn from_internal(status: PurchaseOrderStatus) -> Self {
        match status {
            PurchaseOrderStatus::Draft
            | PurchaseOrderStatus::Issued
            | PurchaseOrderStatus::PartiallyReceived => ExternalStatus::Pending,
            PurchaseOrderStatus::Received => ExternalStatus::Delivered,
            PurchaseOrderStatus::Canceled => ExternalStatus::Canceled,
        }
    }

    /// Inbound direction of the mapping table.
    pub fn to_internal(self) -> PurchaseOrderStatus {
        match self {
            ExternalStatus::Pending => PurchaseOrderStatus::Issued,
            ExternalStatus::Delivered => PurchaseOrderStatus::Received,
            ExternalStatus::Canceled => PurchaseOrderStatus::Canceled,
        }
    }
}

// Request and response DTOs (camelCase per the external contract)

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub supplier: Uuid,
    pub purchase_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub status: Option<ExternalStatus>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<PurchaseItemRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemRequest {
    pub product: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseStatusRequest {
    pub status: ExternalStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PurchaseListParams {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_size")]
    pub size: u64,
}

fn default_size() -> u64 {
    10
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub supplier: Uuid,
    pub purchase_date: NaiveDate,
    pub expected_delivery_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub status: ExternalStatus,
    pub items: Vec<PurchaseItemResponse>,
    pub total: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemResponse {
    pub id: Uuid,
    pub product: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl From<OrderWithItems> for PurchaseResponse {
    fn from(snapshot: OrderWithItems) -> Self {
        let OrderWithItems { order, items } = snapshot;
        Self {
            id: order.id,
            supplier: order.supplier_id,
            purchase_date: order.order_date,
            expected_delivery_date: order.expected_date,
            delivery_date: order.delivery_date,
            status: ExternalStatus::from_internal(order.status),
            items: items
                .into_iter()
                .map(|item| PurchaseItemResponse {
                    id: item.id,
                    product: item.product_id,
                    quantity: item.ordered_quantity,
                    unit_price: item.unit_price,
                    total: item.ordered_quantity * item.unit_price,
                })
                .collect(),
            total: order.total_amount,
            notes: order.notes,
        }
    }
}

fn summary_response(order: purchase_orders::Model) -> PurchaseResponse {
    PurchaseResponse::from(OrderWithItems {
        order,
        items: Vec::new(),
    })
}

fn to_new_items(items: Vec<PurchaseItemRequest>) -> Vec<NewOrderItem> {
    items
        .into_iter()
        .map(|item| NewOrderItem {
            product_id: item.product,
            quantity: item.quantity,
            unit_price: item.unit_price,
            description: None,
            location_id: None,
        })
        .collect()
}

// Handler functions

/// Paginated listing in the original page envelope
#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    params(PurchaseListParams),
    responses((status = 200, description = "Page of purchases")),
    tag = "purchases"
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(params): Query<PurchaseListParams>,
) -> Result<impl IntoResponse, ApiError> {
    // External pages are zero-based, matching the original contract.
    let (orders, total) = state
        .services
        .purchase_orders
        .list_orders(None, params.page + 1, params.size)
        .await
        .map_err(map_service_error)?;

    let size = params.size.max(1);
    let total_pages = (total + size - 1) / size;
    let content: Vec<PurchaseResponse> = orders.into_iter().map(summary_response).collect();

    Ok(success_response(json!({
        "content": content,
        "totalElements": total,
        "totalPages": total_pages,
        "size": params.size,
        "number": params.page,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/{id}",
    params(("id" = Uuid, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase", body = PurchaseResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .services
        .purchase_orders
        .get_order(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PurchaseResponse::from(snapshot)))
}

/// Create a purchase. Only the PENDING inbound status is accepted: an order
/// cannot be born DELIVERED, since delivery is derived from item receipts.
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Purchase created", body = PurchaseResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(payload): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    // Inbound mapping; the order service rejects anything that is not a
    // legal creation status, so DELIVERED and CANCELED fail loudly here.
    let status = payload
        .status
        .map(ExternalStatus::to_internal)
        .unwrap_or(PurchaseOrderStatus::Issued);

    let snapshot = state
        .services
        .purchase_orders
        .create_order(CreateOrder {
            code: None,
            supplier_id: payload.supplier,
            order_date: payload.purchase_date,
            expected_date: payload.expected_delivery_date,
            status: Some(status),
            notes: payload.notes,
            items: to_new_items(payload.items),
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(PurchaseResponse::from(snapshot)))
}

/// Wholesale update: metadata plus full item replacement. Fails once
/// receipts have been recorded against the order.
#[utoipa::path(
    put,
    path = "/api/v1/purchases/{id}",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Updated purchase", body = PurchaseResponse),
        (status = 400, description = "Invalid request or receipts recorded", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn update_purchase(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .fulfillment
        .replace_items(order_id, to_new_items(payload.items))
        .await
        .map_err(map_service_error)?;

    let snapshot = state
        .services
        .purchase_orders
        .update_order(
            order_id,
            UpdateOrder {
                expected_date: payload.expected_delivery_date,
                notes: payload.notes,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PurchaseResponse::from(snapshot)))
}

/// Status change. Only CANCELED is an explicit command; PENDING and
/// DELIVERED are derived from receipts and cannot be forced from outside.
#[utoipa::path(
    patch,
    path = "/api/v1/purchases/{id}/status",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = PurchaseStatusRequest,
    responses(
        (status = 200, description = "Updated purchase", body = PurchaseResponse),
        (status = 400, description = "Unsupported transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn update_purchase_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<PurchaseStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = match payload.status {
        ExternalStatus::Canceled => state
            .services
            .fulfillment
            .cancel_order(order_id)
            .await
            .map_err(map_service_error)?,
        other => {
            return Err(ApiError::ServiceError(ServiceError::IllegalTransition(
                format!(
                    "{:?} is derived from item receipts and cannot be set directly",
                    other
                ),
            )))
        }
    };

    Ok(success_response(PurchaseResponse::from(snapshot)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/purchases/{id}",
    params(("id" = Uuid, Path, description = "Purchase id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .purchase_orders
        .delete_order(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(super::common::no_content_response())
}

/// Simple search by id, code, or supplier name
#[utoipa::path(
    get,
    path = "/api/v1/purchases/search",
    params(SearchParams),
    responses((status = 200, description = "Matching purchases")),
    tag = "purchases"
)]
pub async fn search_purchases(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .purchase_orders
        .search_orders(&params.query)
        .await
        .map_err(map_service_error)?;

    let results: Vec<PurchaseResponse> = orders.into_iter().map(summary_response).collect();

    Ok(success_response(results))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/search", get(search_purchases))
        .route(
            "/:id",
            get(get_purchase)
                .put(update_purchase)
                .delete(delete_purchase),
        )
        .route("/:id/status", patch(update_purchase_status))
}
