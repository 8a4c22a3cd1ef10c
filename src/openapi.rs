use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "supply-manager-api",
        description = "Supplier procurement: purchase orders, goods receipt, and warehouse location capacity tracking"
    ),
    paths(
        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::list_purchase_orders,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::receive_item,
        handlers::purchase_orders::cancel_purchase_order,
        handlers::purchase_orders::replace_items,
        handlers::purchase_orders::delete_purchase_order,
        handlers::purchases::list_purchases,
        handlers::purchases::get_purchase,
        handlers::purchases::create_purchase,
        handlers::purchases::update_purchase,
        handlers::purchases::update_purchase_status,
        handlers::purchases::delete_purchase,
        handlers::purchases::search_purchases,
        handlers::suppliers::create_supplier,
        handlers::suppliers::get_supplier,
        handlers::suppliers::list_suppliers,
        handlers::suppliers::update_supplier,
        handlers::suppliers::delete_supplier,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::list_products,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::locations::create_location,
        handlers::locations::get_location,
        handlers::locations::list_locations,
        handlers::locations::update_location,
        handlers::locations::delete_location,
        handlers::locations::allocate_volume,
        handlers::locations::release_volume,
        handlers::locations::list_location_movements,
        handlers::dashboard::summary,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        handlers::purchase_orders::CreatePurchaseOrderRequest,
        handlers::purchase_orders::PurchaseOrderItemRequest,
        handlers::purchase_orders::ReceiveItemRequest,
        handlers::purchase_orders::ReplaceItemsRequest,
        handlers::purchase_orders::PurchaseOrderResponse,
        handlers::purchase_orders::PurchaseOrderItemResponse,
        handlers::purchases::ExternalStatus,
        handlers::purchases::PurchaseRequest,
        handlers::purchases::PurchaseItemRequest,
        handlers::purchases::PurchaseStatusRequest,
        handlers::purchases::PurchaseResponse,
        handlers::purchases::PurchaseItemResponse,
        handlers::suppliers::CreateSupplierRequest,
        handlers::suppliers::UpdateSupplierRequest,
        handlers::products::CreateProductRequest,
        handlers::products::UpdateProductRequest,
        handlers::locations::CreateLocationRequest,
        handlers::locations::UpdateLocationRequest,
        handlers::locations::VolumeRequest,
    )),
    tags(
        (name = "purchase-orders", description = "Purchase order lifecycle and receiving"),
        (name = "purchases", description = "External purchases view (PENDING/DELIVERED/CANCELED)"),
        (name = "suppliers", description = "Supplier master data"),
        (name = "products", description = "Product master data"),
        (name = "locations", description = "Warehouse locations and capacity"),
        (name = "dashboard", description = "Procurement overview"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs, serving the document at /api-docs/openapi.json.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
