use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        purchase_orders::{self, Entity as OrderEntity, PurchaseOrderStatus},
        stock_movements::{self, Entity as MovementEntity},
    },
    errors::ServiceError,
};

/// Procurement overview: order counts per lifecycle state plus the spend
/// committed on orders that are in flight or received. The spend figure is
/// the sum of order totals, not a valuation of on-hand stock.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_orders: u64,
    pub draft_orders: u64,
    pub issued_orders: u64,
    pub partially_received_orders: u64,
    pub received_orders: u64,
    pub canceled_orders: u64,
    pub procurement_spend: Decimal,
}

#[derive(FromQueryResult)]
struct SpendRow {
    total: Option<Decimal>,
}

/// Read side for stock movements plus the dashboard aggregates.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists stock movements, newest first, optionally scoped to one
    /// location.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        location_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_movements::Model>, u64), ServiceError> {
        let mut query = MovementEntity::find();
        if let Some(location_id) = location_id {
            query = query.filter(stock_movements::Column::LocationId.eq(location_id));
        }

        let paginator = query
            .order_by_desc(stock_movements::Column::OccurredAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((movements, total))
    }

    #[instrument(skip(self))]
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db;

        let count_for = |status: PurchaseOrderStatus| {
            OrderEntity::find()
                .filter(purchase_orders::Column::Status.eq(status))
                .count(db)
        };

        let draft_orders = count_for(PurchaseOrderStatus::Draft).await?;
        let issued_orders = count_for(PurchaseOrderStatus::Issued).await?;
        let partially_received_orders = count_for(PurchaseOrderStatus::PartiallyReceived).await?;
        let received_orders = count_for(PurchaseOrderStatus::Received).await?;
        let canceled_orders = count_for(PurchaseOrderStatus::Canceled).await?;

        let spend = OrderEntity::find()
            .select_only()
            .column_as(purchase_orders::Column::TotalAmount.sum(), "total")
            .filter(purchase_orders::Column::Status.is_not_in([
                PurchaseOrderStatus::Draft,
                PurchaseOrderStatus::Canceled,
            ]))
            .into_model::<SpendRow>()
            .one(db)
            .await?
            .and_then(|row| row.total)
            .unwrap_or(Decimal::ZERO);

        Ok(DashboardSummary {
            total_orders: draft_orders
                + issued_orders
                + partially_received_orders
                + received_orders
                + canceled_orders,
            draft_orders,
            issued_orders,
            partially_received_orders,
            received_orders,
            canceled_orders,
            procurement_spend: spend,
        })
    }
}
