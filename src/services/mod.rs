pub mod capacity;
pub mod fulfillment;
pub mod inventory;
pub mod locations;
pub mod order_status;
pub mod products;
pub mod purchase_orders;
pub mod receiving;
pub mod suppliers;

use std::sync::Arc;

use crate::{db::DbPool, events::EventSender};

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub purchase_orders: Arc<purchase_orders::PurchaseOrderService>,
    pub fulfillment: Arc<fulfillment::FulfillmentService>,
    pub capacity: Arc<capacity::CapacityLedger>,
    pub suppliers: Arc<suppliers::SupplierService>,
    pub products: Arc<products::ProductService>,
    pub locations: Arc<locations::LocationService>,
    pub inventory: Arc<inventory::InventoryService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        let capacity = Arc::new(capacity::CapacityLedger::new(
            db.clone(),
            Some(event_sender.clone()),
        ));
        let fulfillment = Arc::new(fulfillment::FulfillmentService::new(
            db.clone(),
            capacity.clone(),
            Some(event_sender.clone()),
        ));
        let purchase_orders = Arc::new(purchase_orders::PurchaseOrderService::new(
            db.clone(),
            Some(event_sender),
        ));

        Self {
            purchase_orders,
            fulfillment,
            capacity,
            suppliers: Arc::new(suppliers::SupplierService::new(db.clone())),
            products: Arc::new(products::ProductService::new(db.clone())),
            locations: Arc::new(locations::LocationService::new(db.clone())),
            inventory: Arc::new(inventory::InventoryService::new(db)),
        }
    }
}
