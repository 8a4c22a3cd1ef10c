use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning order; items never outlive it.
    pub purchase_order_id: Uuid,
    /// Immutable after creation.
    pub product_id: Uuid,
    /// Frozen once the order leaves Draft.
    pub ordered_quantity: Decimal,
    /// Invariant: 0 <= received_quantity <= ordered_quantity, monotonically
    /// non-decreasing.
    pub received_quantity: Decimal,
    /// Snapshotted at order time; later product price changes do not affect
    /// existing orders.
    pub unit_price: Decimal,
    pub description: Option<String>,
    /// Suggested destination; receipts against it allocate location capacity.
    pub location_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_orders::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_orders::Column::Id"
    )]
    PurchaseOrder,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::warehouse_locations::Entity",
        from = "Column::LocationId",
        to = "super::warehouse_locations::Column::Id"
    )]
    Location,
}

impl Related<super::purchase_orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::warehouse_locations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
