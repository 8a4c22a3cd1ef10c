mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use supply_manager_api::{
    entities::purchase_orders::PurchaseOrderStatus,
    errors::ServiceError,
    services::purchase_orders::NewOrderItem,
};

#[tokio::test]
async fn partial_then_full_receipt_drives_order_status() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(10), dec!(3), None)])
        .await;
    let item_id = order.items[0].id;
    assert_eq!(order.order.status, PurchaseOrderStatus::Issued);

    // First receipt: 4 of 10.
    let snapshot = app
        .state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(4))
        .await
        .expect("partial receipt");
    assert_eq!(snapshot.order.status, PurchaseOrderStatus::PartiallyReceived);
    assert_eq!(snapshot.items[0].received_quantity, dec!(4));
    assert!(!snapshot.order.fully_received);
    assert!(snapshot.order.delivery_date.is_none());

    // Second receipt completes the item and the order.
    let snapshot = app
        .state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(6))
        .await
        .expect("final receipt");
    assert_eq!(snapshot.order.status, PurchaseOrderStatus::Received);
    assert_eq!(snapshot.items[0].received_quantity, dec!(10));
    assert!(snapshot.order.fully_received);
    assert!(snapshot.order.delivery_date.is_some());
}

#[tokio::test]
async fn over_receipt_is_rejected_and_state_unchanged() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(10), dec!(3), None)])
        .await;
    let item_id = order.items[0].id;

    let err = app
        .state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(11))
        .await
        .expect_err("over-receipt must fail");
    assert!(matches!(err, ServiceError::OverReceipt(_)));

    let snapshot = app
        .state
        .services
        .purchase_orders
        .get_order(order.order.id)
        .await
        .unwrap();
    assert_eq!(snapshot.items[0].received_quantity, dec!(0));
    assert_eq!(snapshot.order.status, PurchaseOrderStatus::Issued);
}

#[tokio::test]
async fn received_quantity_is_monotonic_across_receipts() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(10), dec!(1), None)])
        .await;
    let item_id = order.items[0].id;

    let mut last = dec!(0);
    for quantity in [dec!(2), dec!(3), dec!(1)] {
        let snapshot = app
            .state
            .services
            .fulfillment
            .receive_item(order.order.id, item_id, quantity)
            .await
            .expect("receipt");
        let received = snapshot.items[0].received_quantity;
        assert!(received > last, "received quantity must never decrease");
        last = received;
    }
    assert_eq!(last, dec!(6));
}

#[tokio::test]
async fn total_reflects_ordered_quantities_throughout_receiving() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product_a = app.seed_product("SKU-A", None).await;
    let product_b = app.seed_product("SKU-B", None).await;

    let order = app
        .seed_order(
            supplier.id,
            vec![
                (product_a.id, dec!(5), dec!(10), None),
                (product_b.id, dec!(5), dec!(20), None),
            ],
        )
        .await;
    assert_eq!(order.order.total_amount, dec!(150));

    // Fully receive only the first item.
    let item_a = order
        .items
        .iter()
        .find(|i| i.product_id == product_a.id)
        .unwrap();
    let snapshot = app
        .state
        .services
        .fulfillment
        .receive_item(order.order.id, item_a.id, dec!(5))
        .await
        .expect("receipt");

    assert_eq!(snapshot.order.status, PurchaseOrderStatus::PartiallyReceived);
    assert_eq!(snapshot.order.total_amount, dec!(150));
}

#[tokio::test]
async fn receiving_against_canceled_order_is_illegal() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(10), dec!(3), None)])
        .await;
    let item_id = order.items[0].id;

    let canceled = app
        .state
        .services
        .fulfillment
        .cancel_order(order.order.id)
        .await
        .expect("cancel");
    assert_eq!(canceled.order.status, PurchaseOrderStatus::Canceled);

    let err = app
        .state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(1))
        .await
        .expect_err("receiving a canceled order must fail");
    assert!(matches!(err, ServiceError::IllegalTransition(_)));

    let snapshot = app
        .state
        .services
        .purchase_orders
        .get_order(order.order.id)
        .await
        .unwrap();
    assert_eq!(snapshot.order.status, PurchaseOrderStatus::Canceled);
}

#[tokio::test]
async fn cancel_is_rejected_on_terminal_orders() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(2), dec!(3), None)])
        .await;
    let item_id = order.items[0].id;

    app.state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(2))
        .await
        .expect("full receipt");

    let err = app
        .state
        .services
        .fulfillment
        .cancel_order(order.order.id)
        .await
        .expect_err("canceling a received order must fail");
    assert!(matches!(err, ServiceError::IllegalTransition(_)));
}

#[tokio::test]
async fn replace_items_recalculates_total_and_resets_status() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product_a = app.seed_product("SKU-A", None).await;
    let product_b = app.seed_product("SKU-B", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product_a.id, dec!(5), dec!(10), None)])
        .await;
    assert_eq!(order.order.total_amount, dec!(50));

    let snapshot = app
        .state
        .services
        .fulfillment
        .replace_items(
            order.order.id,
            vec![NewOrderItem {
                product_id: product_b.id,
                quantity: dec!(3),
                unit_price: dec!(7),
                description: None,
                location_id: None,
            }],
        )
        .await
        .expect("replace items");

    assert_eq!(snapshot.order.status, PurchaseOrderStatus::Issued);
    assert_eq!(snapshot.order.total_amount, dec!(21));
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].product_id, product_b.id);
}

#[tokio::test]
async fn replace_items_is_blocked_after_first_receipt() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(10), dec!(3), None)])
        .await;
    let item_id = order.items[0].id;

    app.state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(1))
        .await
        .expect("receipt");

    let err = app
        .state
        .services
        .fulfillment
        .replace_items(
            order.order.id,
            vec![NewOrderItem {
                product_id: product.id,
                quantity: dec!(1),
                unit_price: dec!(1),
                description: None,
                location_id: None,
            }],
        )
        .await
        .expect_err("replacement after receipts must fail");
    assert!(matches!(err, ServiceError::IllegalTransition(_)));
}

#[tokio::test]
async fn deleting_an_order_keeps_allocated_capacity_and_history() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    // 0.5 m3 per unit.
    let product = app.seed_product("SKU-001", Some(dec!(0.5))).await;
    let location = app.seed_location("A-01-03", dec!(10)).await;

    let order = app
        .seed_order(
            supplier.id,
            vec![(product.id, dec!(4), dec!(3), Some(location.id))],
        )
        .await;
    let item_id = order.items[0].id;

    app.state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(4))
        .await
        .expect("receipt");

    let loc = app
        .state
        .services
        .locations
        .get_location(location.id)
        .await
        .unwrap();
    assert_eq!(loc.used_volume, dec!(2.0));

    app.state
        .services
        .purchase_orders
        .delete_order(order.order.id)
        .await
        .expect("delete order");

    // Order and items are gone...
    let err = app
        .state
        .services
        .purchase_orders
        .get_order(order.order.id)
        .await
        .expect_err("order must be deleted");
    assert!(matches!(err, ServiceError::NotFound(_)));

    // ...but inventory state survives order history.
    let loc = app
        .state
        .services
        .locations
        .get_location(location.id)
        .await
        .unwrap();
    assert_eq!(loc.used_volume, dec!(2.0));

    let (movements, total) = app
        .state
        .services
        .inventory
        .list_movements(Some(location.id), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(movements[0].quantity, dec!(4));
}

#[tokio::test]
async fn unknown_item_and_order_are_not_found() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    let product = app.seed_product("SKU-001", None).await;

    let order = app
        .seed_order(supplier.id, vec![(product.id, dec!(10), dec!(3), None)])
        .await;

    let err = app
        .state
        .services
        .fulfillment
        .receive_item(order.order.id, uuid::Uuid::new_v4(), dec!(1))
        .await
        .expect_err("unknown item");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = app
        .state
        .services
        .fulfillment
        .receive_item(uuid::Uuid::new_v4(), order.items[0].id, dec!(1))
        .await
        .expect_err("unknown order");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
