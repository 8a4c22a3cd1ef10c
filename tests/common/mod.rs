// Not every integration test exercises every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use supply_manager_api::{
    config::AppConfig,
    db,
    entities::{products, suppliers, warehouse_locations},
    events::{self, EventSender},
    services::{
        locations::CreateLocation,
        products::CreateProduct,
        purchase_orders::{CreateOrder, NewOrderItem, OrderWithItems},
        suppliers::CreateSupplier,
        AppServices,
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by a fresh
/// SQLite database per test.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = format!("supply_manager_test_{}.db", Uuid::new_v4().simple());
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), event_sender.clone());

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .route(
                "/health",
                get(supply_manager_api::health::simple_health_check),
            )
            .nest("/api/v1", supply_manager_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    // Seed helpers going through the real services.

    pub async fn seed_supplier(&self, name: &str) -> suppliers::Model {
        self.state
            .services
            .suppliers
            .create_supplier(CreateSupplier {
                name: name.to_string(),
                cnpj: None,
                email: None,
                address: None,
                notes: None,
            })
            .await
            .expect("seed supplier")
    }

    pub async fn seed_product(&self, sku: &str, volume: Option<Decimal>) -> products::Model {
        self.state
            .services
            .products
            .create_product(CreateProduct {
                sku: sku.to_string(),
                name: format!("Test product {}", sku),
                description: None,
                width: None,
                height: None,
                length: None,
                weight: None,
                volume,
                unit: Some("pc".to_string()),
                default_price: None,
            })
            .await
            .expect("seed product")
    }

    pub async fn seed_location(
        &self,
        code: &str,
        capacity: Decimal,
    ) -> warehouse_locations::Model {
        self.state
            .services
            .locations
            .create_location(CreateLocation {
                code: code.to_string(),
                description: None,
                capacity_volume: capacity,
            })
            .await
            .expect("seed location")
    }

    /// Creates an Issued order over the given (product, quantity, price,
    /// location) tuples.
    pub async fn seed_order(
        &self,
        supplier_id: Uuid,
        items: Vec<(Uuid, Decimal, Decimal, Option<Uuid>)>,
    ) -> OrderWithItems {
        self.state
            .services
            .purchase_orders
            .create_order(CreateOrder {
                code: None,
                supplier_id,
                order_date: None,
                expected_date: None,
                status: None,
                notes: None,
                items: items
                    .into_iter()
                    .map(|(product_id, quantity, unit_price, location_id)| NewOrderItem {
                        product_id,
                        quantity,
                        unit_price,
                        description: None,
                        location_id,
                    })
                    .collect(),
            })
            .await
            .expect("seed order")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_file);
    }
}

/// Reads a response body as JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not valid json")
}

/// Parses a JSON field as a decimal regardless of whether the backend
/// serialized it as a string or a bare number.
pub fn as_decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected a decimal value, got {other:?}"),
    }
}
