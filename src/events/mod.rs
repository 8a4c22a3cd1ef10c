use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after a successful commit.
///
/// Emission is best-effort: a full or closed channel is logged and the
/// command result is unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Purchase order lifecycle
    PurchaseOrderCreated(Uuid),
    PurchaseOrderCanceled(Uuid),
    /// All items fully received; the order reached its terminal state.
    PurchaseOrderReceived(Uuid),
    PurchaseOrderItemsReplaced {
        order_id: Uuid,
        item_count: usize,
    },
    PurchaseOrderDeleted(Uuid),

    // Receiving
    ItemReceived {
        order_id: Uuid,
        item_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        location_id: Option<Uuid>,
    },

    // Capacity ledger
    CapacityAllocated {
        location_id: Uuid,
        volume: Decimal,
    },
    CapacityReleased {
        location_id: Uuid,
        volume: Decimal,
    },
}

impl Event {
    /// Stable name used in logs and downstream routing.
    pub fn name(&self) -> &'static str {
        match self {
            Event::PurchaseOrderCreated(_) => "purchase_order.created",
            Event::PurchaseOrderCanceled(_) => "purchase_order.canceled",
            Event::PurchaseOrderReceived(_) => "purchase_order.received",
            Event::PurchaseOrderItemsReplaced { .. } => "purchase_order.items_replaced",
            Event::PurchaseOrderDeleted(_) => "purchase_order.deleted",
            Event::ItemReceived { .. } => "purchase_order.item_received",
            Event::CapacityAllocated { .. } => "location.capacity_allocated",
            Event::CapacityReleased { .. } => "location.capacity_released",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(err) = self.send(event).await {
            warn!(event = name, "dropping domain event: {}", err);
        }
    }
}

/// Background consumer: logs every event as structured telemetry.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(event = event.name(), payload = ?event, "domain event");
    }
    info!("event channel closed; event processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let sender = EventSender::new(tx);
        // Must not panic or error out.
        sender
            .send_or_log(Event::PurchaseOrderCreated(Uuid::new_v4()))
            .await;
    }

    #[test]
    fn event_names_are_namespaced() {
        assert_eq!(
            Event::PurchaseOrderReceived(Uuid::new_v4()).name(),
            "purchase_order.received"
        );
        assert_eq!(
            Event::CapacityAllocated {
                location_id: Uuid::new_v4(),
                volume: Decimal::ONE,
            }
            .name(),
            "location.capacity_allocated"
        );
    }
}
