use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        purchase_order_items::{self, Entity as ItemEntity},
        warehouse_locations::{self, Entity as LocationEntity},
    },
    errors::ServiceError,
};

#[derive(Debug, Clone)]
pub struct CreateLocation {
    pub code: String,
    pub description: Option<String>,
    pub capacity_volume: Decimal,
}

/// Capacity is fixed at creation and used volume belongs to the capacity
/// ledger, so only the descriptive fields are updatable.
#[derive(Debug, Clone, Default)]
pub struct UpdateLocation {
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct LocationService {
    db: Arc<DbPool>,
}

impl LocationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query =
            LocationEntity::find().filter(warehouse_locations::Column::Code.eq(code.to_string()));
        if let Some(id) = except {
            query = query.filter(warehouse_locations::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "a warehouse location with code '{}' already exists",
                code
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, create))]
    pub async fn create_location(
        &self,
        create: CreateLocation,
    ) -> Result<warehouse_locations::Model, ServiceError> {
        if create.capacity_volume <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "capacity volume must be positive, got {}",
                create.capacity_volume
            )));
        }
        self.ensure_code_free(&create.code, None).await?;

        let location = warehouse_locations::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(create.code),
            description: Set(create.description),
            capacity_volume: Set(create.capacity_volume),
            used_volume: Set(Decimal::ZERO),
        };
        let location = location.insert(&*self.db).await?;

        info!(
            "Warehouse location {} ({}) created with capacity {}",
            location.id, location.code, location.capacity_volume
        );
        Ok(location)
    }

    #[instrument(skip(self))]
    pub async fn get_location(&self, id: Uuid) -> Result<warehouse_locations::Model, ServiceError> {
        LocationEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse location {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_locations(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<warehouse_locations::Model>, u64), ServiceError> {
        let paginator = LocationEntity::find()
            .order_by_asc(warehouse_locations::Column::Code)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let locations = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((locations, total))
    }

    #[instrument(skip(self, update))]
    pub async fn update_location(
        &self,
        id: Uuid,
        update: UpdateLocation,
    ) -> Result<warehouse_locations::Model, ServiceError> {
        let location = self.get_location(id).await?;

        if let Some(code) = &update.code {
            self.ensure_code_free(code, Some(id)).await?;
        }

        let mut active: warehouse_locations::ActiveModel = location.into();
        if let Some(code) = update.code {
            active.code = Set(code);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }

        Ok(active.update(&*self.db).await?)
    }

    /// Locations still targeted by order items or holding allocated volume
    /// cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete_location(&self, id: Uuid) -> Result<(), ServiceError> {
        let location = self.get_location(id).await?;

        if location.used_volume > Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "warehouse location {} still has {} in use",
                location.code, location.used_volume
            )));
        }

        let item_count = ItemEntity::find()
            .filter(purchase_order_items::Column::LocationId.eq(id))
            .count(&*self.db)
            .await?;
        if item_count > 0 {
            return Err(ServiceError::InvalidReference(format!(
                "warehouse location {} is referenced by {} purchase order item(s)",
                id, item_count
            )));
        }

        LocationEntity::delete_by_id(location.id)
            .exec(&*self.db)
            .await?;

        info!("Warehouse location {} deleted", id);
        Ok(())
    }
}
