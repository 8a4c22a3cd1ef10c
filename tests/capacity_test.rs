mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use supply_manager_api::errors::ServiceError;

#[tokio::test]
async fn allocation_beyond_capacity_is_rejected_without_mutation() {
    let app = TestApp::new().await;
    let location = app.seed_location("A-01-01", dec!(5)).await;
    let ledger = app.state.services.capacity.clone();

    ledger.allocate(location.id, dec!(4)).await.expect("seed allocation");

    let err = ledger
        .allocate(location.id, dec!(2))
        .await
        .expect_err("over-allocation must fail");
    assert!(matches!(err, ServiceError::InsufficientCapacity(_)));

    let loc = app
        .state
        .services
        .locations
        .get_location(location.id)
        .await
        .unwrap();
    assert_eq!(loc.used_volume, dec!(4));

    // Filling the remaining volume exactly still works.
    let loc = ledger.allocate(location.id, dec!(1)).await.expect("fill");
    assert_eq!(loc.used_volume, dec!(5));
}

#[tokio::test]
async fn release_never_exceeds_allocated_volume() {
    let app = TestApp::new().await;
    let location = app.seed_location("A-01-02", dec!(5)).await;
    let ledger = app.state.services.capacity.clone();

    ledger.allocate(location.id, dec!(3)).await.expect("allocate");

    let err = ledger
        .release(location.id, dec!(4))
        .await
        .expect_err("over-release must fail");
    assert!(matches!(err, ServiceError::OverRelease(_)));

    let loc = ledger.release(location.id, dec!(3)).await.expect("release");
    assert_eq!(loc.used_volume, dec!(0));
}

#[tokio::test]
async fn unknown_location_is_not_found() {
    let app = TestApp::new().await;
    let ledger = app.state.services.capacity.clone();

    let err = ledger
        .allocate(uuid::Uuid::new_v4(), dec!(1))
        .await
        .expect_err("unknown location");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn receipt_without_product_volume_has_zero_footprint() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    // No declared volume: receipts occupy no space but still log a movement.
    let product = app.seed_product("SKU-NOVOL", None).await;
    let location = app.seed_location("B-02-01", dec!(1)).await;

    let order = app
        .seed_order(
            supplier.id,
            vec![(product.id, dec!(100), dec!(1), Some(location.id))],
        )
        .await;

    app.state
        .services
        .fulfillment
        .receive_item(order.order.id, order.items[0].id, dec!(100))
        .await
        .expect("receipt of zero-footprint product");

    let loc = app
        .state
        .services
        .locations
        .get_location(location.id)
        .await
        .unwrap();
    assert_eq!(loc.used_volume, dec!(0));

    let (_, total) = app
        .state
        .services
        .inventory
        .list_movements(Some(location.id), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn failed_allocation_rolls_back_the_receipt() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme Industrial").await;
    // 2 m3 per unit against a 5 m3 location: the third unit cannot fit.
    let product = app.seed_product("SKU-BULKY", Some(dec!(2))).await;
    let location = app.seed_location("C-03-01", dec!(5)).await;

    let order = app
        .seed_order(
            supplier.id,
            vec![(product.id, dec!(3), dec!(10), Some(location.id))],
        )
        .await;
    let item_id = order.items[0].id;

    app.state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(2))
        .await
        .expect("two units fit");

    let err = app
        .state
        .services
        .fulfillment
        .receive_item(order.order.id, item_id, dec!(1))
        .await
        .expect_err("third unit must not fit");
    assert!(matches!(err, ServiceError::InsufficientCapacity(_)));

    // All-or-nothing: the received quantity from the failed command is not
    // committed, and no extra movement is recorded.
    let snapshot = app
        .state
        .services
        .purchase_orders
        .get_order(order.order.id)
        .await
        .unwrap();
    assert_eq!(snapshot.items[0].received_quantity, dec!(2));

    let loc = app
        .state
        .services
        .locations
        .get_location(location.id)
        .await
        .unwrap();
    assert_eq!(loc.used_volume, dec!(4));

    let (_, total) = app
        .state
        .services
        .inventory
        .list_movements(Some(location.id), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn concurrent_allocations_never_lose_updates() {
    let app = TestApp::new().await;
    let location = app.seed_location("D-04-01", dec!(10)).await;
    let ledger = app.state.services.capacity.clone();

    // 20 concurrent one-unit allocations against 10 units of capacity:
    // exactly 10 succeed and the rest observe the earlier allocations.
    let mut tasks = vec![];
    for _ in 0..20 {
        let ledger = ledger.clone();
        let location_id = location.id;
        tasks.push(tokio::spawn(async move {
            ledger.allocate(location_id, dec!(1)).await.is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            successes += 1;
        }
    }
    assert_eq!(
        successes, 10,
        "exactly 10 allocations should succeed; got {}",
        successes
    );

    let loc = app
        .state
        .services
        .locations
        .get_location(location.id)
        .await
        .unwrap();
    assert_eq!(loc.used_volume, dec!(10));
}
