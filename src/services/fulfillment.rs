//! Fulfillment engine: composes the receiving tracker, the capacity ledger,
//! and the order state machine into one atomic update per command.
//!
//! Commands against the same order serialize on a per-order-id mutex;
//! commands against different orders run fully in parallel. Every command
//! computes its state transition in memory and persists the order + item +
//! location group in a single transaction. A rejected step rolls the whole
//! transaction back, so no partial receipt or partial allocation is ever
//! observable.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        products::Entity as ProductEntity,
        purchase_order_items::{self, Entity as ItemEntity},
        purchase_orders,
        stock_movements::{self, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        capacity::CapacityLedger,
        order_status,
        purchase_orders::{build_items, item_active, load_order_with_items, NewOrderItem, OrderWithItems},
        receiving::{self, ItemCompletion},
    },
};

/// Transient persistence faults get this many attempts; business-rule
/// errors always propagate on the first.
const MAX_PERSIST_ATTEMPTS: u32 = 3;

struct ReceiptOutcome {
    snapshot: OrderWithItems,
    product_id: Uuid,
    location_id: Option<Uuid>,
    allocated_volume: Decimal,
    became_received: bool,
}

#[derive(Clone)]
pub struct FulfillmentService {
    db: Arc<DbPool>,
    capacity: Arc<CapacityLedger>,
    order_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    event_sender: Option<EventSender>,
}

impl FulfillmentService {
    pub fn new(
        db: Arc<DbPool>,
        capacity: Arc<CapacityLedger>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            capacity,
            order_locks: Arc::new(DashMap::new()),
            event_sender,
        }
    }

    async fn order_lock(&self, order_id: Uuid) -> OwnedMutexGuard<()> {
        self.order_locks
            .entry(order_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
            .lock_owned()
            .await
    }

    /// Re-runs `op` on transient persistence faults. Since every command is
    /// side-effect-free until its final commit, re-execution from the top is
    /// safe.
    async fn with_retries<T, Fut, F>(op: F) -> Result<T, ServiceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Err(err) if err.is_transient() && attempt < MAX_PERSIST_ATTEMPTS => {
                    warn!(attempt, "transient persistence fault, re-running command");
                }
                other => return other,
            }
        }
    }

    /// Records a receipt of `quantity` against one item of the order.
    ///
    /// Validations, capacity allocation, and the status recompute all happen
    /// against one snapshot and commit as one unit; the receiving-quantity
    /// update is never visible if the capacity allocation is rejected.
    #[instrument(skip(self))]
    pub async fn receive_item(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
    ) -> Result<OrderWithItems, ServiceError> {
        let _order_guard = self.order_lock(order_id).await;

        let outcome =
            Self::with_retries(|| self.try_receive_item(order_id, item_id, quantity)).await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::ItemReceived {
                    order_id,
                    item_id,
                    product_id: outcome.product_id,
                    quantity,
                    location_id: outcome.location_id,
                })
                .await;

            if !outcome.allocated_volume.is_zero() {
                if let Some(location_id) = outcome.location_id {
                    sender
                        .send_or_log(Event::CapacityAllocated {
                            location_id,
                            volume: outcome.allocated_volume,
                        })
                        .await;
                }
            }

            if outcome.became_received {
                sender
                    .send_or_log(Event::PurchaseOrderReceived(order_id))
                    .await;
            }
        }

        info!(
            "Receipt of {} against item {} on purchase order {}; order now {}",
            quantity, item_id, order_id, outcome.snapshot.order.status
        );

        Ok(outcome.snapshot)
    }

    async fn try_receive_item(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
    ) -> Result<ReceiptOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let snapshot = load_order_with_items(&txn, order_id).await?;
        order_status::ensure_receivable(snapshot.order.status)?;

        let item = snapshot
            .items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Item {} not found on purchase order {}",
                    item_id, order_id
                ))
            })?;

        let (new_received, _) = receiving::receive_quantity(&item, quantity)?;

        let mut active_item: purchase_order_items::ActiveModel = item.clone().into();
        active_item.received_quantity = Set(new_received);
        let updated_item = active_item.update(&txn).await?;

        // The location lock, when taken, must outlive the commit below.
        let mut _location_guard = None;
        let mut allocated_volume = Decimal::ZERO;
        if let Some(location_id) = item.location_id {
            let product = ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidReference(format!(
                        "Product {} not found",
                        item.product_id
                    ))
                })?;

            let footprint = receiving::receipt_footprint(quantity, product.volume);
            if !footprint.is_zero() {
                _location_guard = Some(self.capacity.lock(location_id).await);
                self.capacity
                    .allocate_in(&txn, location_id, footprint)
                    .await?;
                allocated_volume = footprint;
            }

            let reference = snapshot
                .order
                .code
                .clone()
                .unwrap_or_else(|| snapshot.order.id.to_string());
            stock_movements::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(item.product_id),
                quantity: Set(quantity),
                movement_type: Set(MovementType::In),
                occurred_at: Set(Utc::now()),
                reference: Set(Some(reference)),
                location_id: Set(Some(location_id)),
            }
            .insert(&txn)
            .await?;
        }

        let completions: Vec<ItemCompletion> = snapshot
            .items
            .iter()
            .map(|i| {
                let received = if i.id == item_id {
                    new_received
                } else {
                    i.received_quantity
                };
                receiving::completion(received, i.ordered_quantity)
            })
            .collect();

        let previous_status = snapshot.order.status;
        let new_status = order_status::recompute(previous_status, &completions);
        let became_received =
            new_status == purchase_orders::PurchaseOrderStatus::Received && !previous_status.is_terminal();

        let mut order_active: purchase_orders::ActiveModel = snapshot.order.clone().into();
        order_active.status = Set(new_status);
        if became_received {
            order_active.delivery_date = Set(Some(Utc::now().date_naive()));
            order_active.fully_received = Set(true);
        }
        order_active.updated_at = Set(Some(Utc::now()));
        let order = order_active.update(&txn).await?;

        txn.commit().await?;

        let items = snapshot
            .items
            .into_iter()
            .map(|i| if i.id == item_id { updated_item.clone() } else { i })
            .collect();

        Ok(ReceiptOutcome {
            snapshot: OrderWithItems { order, items },
            product_id: item.product_id,
            location_id: item.location_id,
            allocated_volume,
            became_received,
        })
    }

    /// Cancels an order. Only reachable from non-terminal states; once
    /// canceled, receiving and recompute leave the order alone.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let _order_guard = self.order_lock(order_id).await;

        let snapshot = Self::with_retries(|| self.try_cancel_order(order_id)).await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PurchaseOrderCanceled(order_id))
                .await;
        }

        info!("Purchase order {} canceled", order_id);

        Ok(snapshot)
    }

    async fn try_cancel_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let snapshot = load_order_with_items(&txn, order_id).await?;
        let new_status = order_status::cancel(snapshot.order.status)?;

        let mut order_active: purchase_orders::ActiveModel = snapshot.order.into();
        order_active.status = Set(new_status);
        order_active.updated_at = Set(Some(Utc::now()));
        let order = order_active.update(&txn).await?;

        txn.commit().await?;

        Ok(OrderWithItems {
            order,
            items: snapshot.items,
        })
    }

    /// Replaces the entire item collection. Legal only while the order is
    /// Draft or Issued with no receipts yet; reruns the total calculator and
    /// resets the status to Issued.
    #[instrument(skip(self, new_items))]
    pub async fn replace_items(
        &self,
        order_id: Uuid,
        new_items: Vec<NewOrderItem>,
    ) -> Result<OrderWithItems, ServiceError> {
        let _order_guard = self.order_lock(order_id).await;

        let snapshot =
            Self::with_retries(|| self.try_replace_items(order_id, &new_items)).await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PurchaseOrderItemsReplaced {
                    order_id,
                    item_count: snapshot.items.len(),
                })
                .await;
        }

        info!(
            "Purchase order {} items replaced; {} items, total {}",
            order_id,
            snapshot.items.len(),
            snapshot.order.total_amount
        );

        Ok(snapshot)
    }

    async fn try_replace_items(
        &self,
        order_id: Uuid,
        new_items: &[NewOrderItem],
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let snapshot = load_order_with_items(&txn, order_id).await?;

        if snapshot.order.status.is_terminal() {
            return Err(ServiceError::IllegalTransition(format!(
                "cannot replace items on a {} purchase order",
                snapshot.order.status
            )));
        }
        if snapshot
            .items
            .iter()
            .any(|i| i.received_quantity > Decimal::ZERO)
        {
            return Err(ServiceError::IllegalTransition(
                "cannot replace items once receipts have been recorded".to_string(),
            ));
        }

        let rows = build_items(&txn, order_id, new_items).await?;
        let total = order_status::order_total(&rows);

        ItemEntity::delete_many()
            .filter(purchase_order_items::Column::PurchaseOrderId.eq(order_id))
            .exec(&txn)
            .await?;

        if !rows.is_empty() {
            let active_items: Vec<purchase_order_items::ActiveModel> =
                rows.iter().map(item_active).collect();
            ItemEntity::insert_many(active_items).exec(&txn).await?;
        }

        let mut order_active: purchase_orders::ActiveModel = snapshot.order.into();
        order_active.status = Set(purchase_orders::PurchaseOrderStatus::Issued);
        order_active.total_amount = Set(total);
        order_active.fully_received = Set(false);
        order_active.updated_at = Set(Some(Utc::now()));
        let order = order_active.update(&txn).await?;

        txn.commit().await?;

        Ok(OrderWithItems { order, items: rows })
    }
}
