use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a purchase order.
///
/// `Draft -> Issued -> { PartiallyReceived <-> ... -> Received }`, with
/// `Canceled` reachable from any non-terminal state. `Received` and
/// `Canceled` are terminal.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "Issued")]
    Issued,
    #[sea_orm(string_value = "PartiallyReceived")]
    PartiallyReceived,
    #[sea_orm(string_value = "Received")]
    Received,
    #[sea_orm(string_value = "Canceled")]
    Canceled,
}

impl PurchaseOrderStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Received | Self::Canceled)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable order number, e.g. "PO-2026-0001"; unique when present.
    pub code: Option<String>,
    pub supplier_id: Uuid,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    /// Actual delivery date; set once, when the last item completes.
    pub delivery_date: Option<NaiveDate>,
    pub status: PurchaseOrderStatus,
    /// Derived: sum of ordered_quantity * unit_price over the items. Never
    /// set by callers.
    pub total_amount: Decimal,
    /// Derived: kept in sync with `status == Received`.
    pub fully_received: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::suppliers::Entity",
        from = "Column::SupplierId",
        to = "super::suppliers::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::purchase_order_items::Entity")]
    PurchaseOrderItems,
}

impl Related<super::suppliers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::purchase_order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
