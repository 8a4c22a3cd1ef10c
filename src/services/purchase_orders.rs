use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        products::Entity as ProductEntity,
        purchase_order_items::{self, Entity as ItemEntity},
        purchase_orders::{self, Entity as OrderEntity, PurchaseOrderStatus},
        suppliers::Entity as SupplierEntity,
        warehouse_locations::Entity as LocationEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::order_status,
};

/// A line item as submitted by callers; quantities validated and product /
/// location references resolved before anything is persisted.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub description: Option<String>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub code: Option<String>,
    pub supplier_id: Uuid,
    pub order_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    pub status: Option<PurchaseOrderStatus>,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct UpdateOrder {
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// One consistent snapshot of an order and the items it owns.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    pub order: purchase_orders::Model,
    pub items: Vec<purchase_order_items::Model>,
}

/// Materializes an item row as an all-`Set` active model for insertion.
pub(crate) fn item_active(
    model: &purchase_order_items::Model,
) -> purchase_order_items::ActiveModel {
    purchase_order_items::ActiveModel {
        id: Set(model.id),
        purchase_order_id: Set(model.purchase_order_id),
        product_id: Set(model.product_id),
        ordered_quantity: Set(model.ordered_quantity),
        received_quantity: Set(model.received_quantity),
        unit_price: Set(model.unit_price),
        description: Set(model.description.clone()),
        location_id: Set(model.location_id),
    }
}

/// Validates submitted items against master data and materializes them as
/// rows for `order_id`. Shared between order creation and wholesale item
/// replacement.
pub(crate) async fn build_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    items: &[NewOrderItem],
) -> Result<Vec<purchase_order_items::Model>, ServiceError> {
    let mut rows = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity <= Decimal::ZERO {
            return Err(ServiceError::InvalidQuantity(format!(
                "ordered quantity must be positive, got {}",
                item.quantity
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "unit price must not be negative, got {}",
                item.unit_price
            )));
        }

        ProductEntity::find_by_id(item.product_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidReference(format!("Product {} not found", item.product_id))
            })?;

        if let Some(location_id) = item.location_id {
            LocationEntity::find_by_id(location_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidReference(format!(
                        "Warehouse location {} not found",
                        location_id
                    ))
                })?;
        }

        rows.push(purchase_order_items::Model {
            id: Uuid::new_v4(),
            purchase_order_id: order_id,
            product_id: item.product_id,
            ordered_quantity: item.quantity,
            received_quantity: Decimal::ZERO,
            unit_price: item.unit_price,
            description: item.description.clone(),
            location_id: item.location_id,
        });
    }

    Ok(rows)
}

/// Loads an order and its items as one snapshot inside `conn`.
pub(crate) async fn load_order_with_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<OrderWithItems, ServiceError> {
    let order = OrderEntity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Purchase order {} not found", order_id))
        })?;

    let items = ItemEntity::find()
        .filter(purchase_order_items::Column::PurchaseOrderId.eq(order_id))
        .all(conn)
        .await?;

    Ok(OrderWithItems { order, items })
}

/// Creation, lookup, and destruction of purchase orders. Receiving, item
/// replacement, and cancellation live in the fulfillment engine.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a purchase order with its items. Orders start as Draft or
    /// directly Issued, never with received quantities; the total is derived
    /// here and nowhere else.
    #[instrument(skip(self, create))]
    pub async fn create_order(&self, create: CreateOrder) -> Result<OrderWithItems, ServiceError> {
        let status = create.status.unwrap_or(PurchaseOrderStatus::Issued);
        if !matches!(
            status,
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Issued
        ) {
            return Err(ServiceError::ValidationError(format!(
                "new purchase orders start as Draft or Issued, not {}",
                status
            )));
        }

        let txn = self.db.begin().await?;

        SupplierEntity::find_by_id(create.supplier_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidReference(format!(
                    "Supplier {} not found",
                    create.supplier_id
                ))
            })?;

        if let Some(code) = &create.code {
            let exists = OrderEntity::find()
                .filter(purchase_orders::Column::Code.eq(code.clone()))
                .count(&txn)
                .await?;
            if exists > 0 {
                return Err(ServiceError::ValidationError(format!(
                    "purchase order code '{}' is already in use",
                    code
                )));
            }
        }

        let order_id = Uuid::new_v4();
        let items = build_items(&txn, order_id, &create.items).await?;
        let total = order_status::order_total(&items);

        let order = purchase_orders::ActiveModel {
            id: Set(order_id),
            code: Set(create.code),
            supplier_id: Set(create.supplier_id),
            order_date: Set(create
                .order_date
                .unwrap_or_else(|| Utc::now().date_naive())),
            expected_date: Set(create.expected_date),
            delivery_date: Set(None),
            status: Set(status),
            total_amount: Set(total),
            fully_received: Set(false),
            notes: Set(create.notes),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let order = order.insert(&txn).await?;

        if !items.is_empty() {
            let active_items: Vec<purchase_order_items::ActiveModel> =
                items.iter().map(item_active).collect();
            ItemEntity::insert_many(active_items).exec(&txn).await?;
        }

        txn.commit().await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PurchaseOrderCreated(order.id))
                .await;
        }

        info!(
            "Purchase order {} created with {} items, total {}",
            order.id,
            items.len(),
            order.total_amount
        );

        Ok(OrderWithItems { order, items })
    }

    /// Fetches an order with its items.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        load_order_with_items(&*self.db, order_id).await
    }

    /// Lists orders, optionally filtered by status, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<purchase_orders::Model>, u64), ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(purchase_orders::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(purchase_orders::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((orders, total))
    }

    /// Updates mutable order metadata. Status, totals, and received
    /// quantities are owned by the fulfillment engine and untouchable here.
    #[instrument(skip(self, update))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        update: UpdateOrder,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let snapshot = load_order_with_items(&txn, order_id).await?;

        let mut active: purchase_orders::ActiveModel = snapshot.order.into();
        if let Some(expected) = update.expected_date {
            active.expected_date = Set(Some(expected));
        }
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await?;

        txn.commit().await?;

        Ok(OrderWithItems {
            order,
            items: snapshot.items,
        })
    }

    /// Deletes an order and, in the same transaction, every item it owns.
    /// Capacity allocated by past receipts stays allocated: inventory state
    /// is kept separate from order history.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;

        ItemEntity::delete_many()
            .filter(purchase_order_items::Column::PurchaseOrderId.eq(order_id))
            .exec(&txn)
            .await?;

        OrderEntity::delete_by_id(order.id).exec(&txn).await?;

        txn.commit().await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PurchaseOrderDeleted(order_id))
                .await;
        }

        info!("Purchase order {} deleted", order_id);

        Ok(())
    }

    /// Simple search across id, code, and supplier name.
    #[instrument(skip(self))]
    pub async fn search_orders(
        &self,
        query: &str,
    ) -> Result<Vec<purchase_orders::Model>, ServiceError> {
        let needle = query.to_lowercase();

        let orders = OrderEntity::find()
            .find_also_related(SupplierEntity)
            .order_by_desc(purchase_orders::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(orders
            .into_iter()
            .filter(|(order, supplier)| {
                order.id.to_string().contains(&needle)
                    || order
                        .code
                        .as_deref()
                        .map(|c| c.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                    || supplier
                        .as_ref()
                        .map(|s| s.name.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .map(|(order, _)| order)
            .collect())
    }
}
