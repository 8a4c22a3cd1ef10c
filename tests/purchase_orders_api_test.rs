mod common;

use axum::http::{Method, StatusCode};
use common::{as_decimal, read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn purchase_order_lifecycle_over_http() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    // Create.
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "code": "PO-2026-0001",
                "supplier_id": supplier.id,
                "items": [
                    { "product_id": product.id, "quantity": "10", "unit_price": "3" }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["status"], "Issued");
    assert_eq!(as_decimal(&body["total_amount"]), dec!(30));
    let order_id = body["id"].as_str().unwrap().to_string();
    let item_id = body["items"][0]["id"].as_str().unwrap().to_string();

    // Partial receipt.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/items/{item_id}/receive"),
            Some(json!({ "quantity": "4" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "PartiallyReceived");
    assert_eq!(as_decimal(&body["items"][0]["received_quantity"]), dec!(4));

    // List filtered by status.
    let response = app
        .request(
            Method::GET,
            "/api/v1/purchase-orders?status=PartiallyReceived",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);

    // Final receipt.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/items/{item_id}/receive"),
            Some(json!({ "quantity": "6" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "Received");
    assert_eq!(body["fully_received"], true);
    assert!(body["delivery_date"].is_string());

    // Further receipts are an illegal transition.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/items/{item_id}/receive"),
            Some(json!({ "quantity": "1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn error_taxonomy_maps_to_http_statuses() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-BULKY", Some(dec!(2))).await;
    let location = app.seed_location("A-01-01", dec!(5)).await;

    let order = app
        .seed_order(
            supplier.id,
            vec![(product.id, dec!(10), dec!(1), Some(location.id))],
        )
        .await;
    let order_id = order.order.id;
    let item_id = order.items[0].id;

    // Unknown order -> 404.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/purchase-orders/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unknown item -> 404.
    let response = app
        .request(
            Method::POST,
            &format!(
                "/api/v1/purchase-orders/{order_id}/items/{}/receive",
                uuid::Uuid::new_v4()
            ),
            Some(json!({ "quantity": "1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Invalid quantity -> 400.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/items/{item_id}/receive"),
            Some(json!({ "quantity": "0" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Over-receipt -> 400.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/items/{item_id}/receive"),
            Some(json!({ "quantity": "11" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Insufficient capacity -> 409 (3 units of 2 m3 into 5 m3).
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/items/{item_id}/receive"),
            Some(json!({ "quantity": "3" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Conflict");

    // Invalid reference on creation -> 400.
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "supplier_id": uuid::Uuid::new_v4(),
                "items": []
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Over-release via the ledger endpoint -> 409.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/locations/{}/release", location.id),
            Some(json!({ "volume": "1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_then_receive_fails_and_preserves_cancellation() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(10), dec!(3), None)])
        .await;
    let order_id = order.order.id;
    let item_id = order.items[0].id;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "Canceled");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/items/{item_id}/receive"),
            Some(json!({ "quantity": "1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/purchase-orders/{order_id}"),
            None,
        )
        .await;
    let body = read_json(response).await;
    assert_eq!(body["status"], "Canceled");
}

#[tokio::test]
async fn external_purchases_view_speaks_the_collapsed_vocabulary() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    // Create through the external surface.
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier": supplier.id,
                "status": "PENDING",
                "items": [
                    { "product": product.id, "quantity": "5", "unitPrice": "10" }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(as_decimal(&body["total"]), dec!(50));
    let order_id = body["id"].as_str().unwrap().to_string();
    let item_id = app
        .state
        .services
        .purchase_orders
        .get_order(order_id.parse().unwrap())
        .await
        .unwrap()
        .items[0]
        .id;

    // An order cannot be born DELIVERED.
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier": supplier.id,
                "status": "DELIVERED",
                "items": []
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Partial receipt still reads PENDING externally.
    app.state
        .services
        .fulfillment
        .receive_item(order_id.parse().unwrap(), item_id, dec!(2))
        .await
        .unwrap();
    let response = app
        .request(Method::GET, &format!("/api/v1/purchases/{order_id}"), None)
        .await;
    let body = read_json(response).await;
    assert_eq!(body["status"], "PENDING");

    // Full receipt reads DELIVERED.
    app.state
        .services
        .fulfillment
        .receive_item(order_id.parse().unwrap(), item_id, dec!(3))
        .await
        .unwrap();
    let response = app
        .request(Method::GET, &format!("/api/v1/purchases/{order_id}"), None)
        .await;
    let body = read_json(response).await;
    assert_eq!(body["status"], "DELIVERED");
    assert!(body["deliveryDate"].is_string());

    // DELIVERED cannot be forced through the status patch.
    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/purchases/{order_id}/status"),
            Some(json!({ "status": "DELIVERED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The list envelope follows the original page contract.
    let response = app
        .request(Method::GET, "/api/v1/purchases?page=0&size=10", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["totalElements"], 1);
    assert_eq!(body["number"], 0);
    assert!(body["content"].is_array());
}

#[tokio::test]
async fn external_cancel_via_status_patch() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(5), dec!(10), None)])
        .await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/purchases/{}/status", order.order.id),
            Some(json!({ "status": "CANCELED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "CANCELED");
}

#[tokio::test]
async fn master_data_uniqueness_is_enforced() {
    let app = TestApp::new().await;

    app.seed_product("SKU-001", None).await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "SKU-001", "name": "Duplicate" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.seed_location("A-01-01", dec!(5)).await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/locations",
            Some(json!({ "code": "A-01-01", "capacity_volume": "3" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Location capacity must be positive.
    let response = app
        .request(
            Method::POST,
            "/api/v1/locations",
            Some(json!({ "code": "B-01-01", "capacity_volume": "0" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_summary_reports_counts_and_spend() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order_a = app
        .seed_order(supplier.id, vec![(product.id, dec!(5), dec!(10), None)])
        .await;
    app.seed_order(supplier.id, vec![(product.id, dec!(2), dec!(30), None)])
        .await;

    // Cancel one order: its total drops out of the spend figure.
    app.state
        .services
        .fulfillment
        .cancel_order(order_a.order.id)
        .await
        .unwrap();

    let response = app
        .request(Method::GET, "/api/v1/dashboard/summary", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total_orders"], 2);
    assert_eq!(body["issued_orders"], 1);
    assert_eq!(body["canceled_orders"], 1);
    assert_eq!(as_decimal(&body["procurement_spend"]), dec!(60));
}
