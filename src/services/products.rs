use std::sync::Arc;

use chrono::Utc;
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
        products::{self, Entity as ProductEntity},
        purchase_order_items::{self, Entity as ItemEntity},
    },
    errors::ServiceError,
};

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub length: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub unit: Option<String>,
    pub default_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub volume: Option<Decimal>,
    pub unit: Option<String>,
    pub default_price: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn ensure_sku_free(&self, sku: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = ProductEntity::find().filter(products::Column::Sku.eq(sku.to_string()));
        if let Some(id) = except {
            query = query.filter(products::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "a product with sku '{}' already exists",
                sku
            )));
        }
        Ok(())
    }

    fn check_dimensions(create: &CreateProduct) -> Result<(), ServiceError> {
        for (label, value) in [
            ("width", create.width),
            ("height", create.height),
            ("length", create.length),
            ("weight", create.weight),
            ("volume", create.volume),
            ("default_price", create.default_price),
        ] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(format!(
                        "{} must not be negative, got {}",
                        label, v
                    )));
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self, create))]
    pub async fn create_product(
        &self,
        create: CreateProduct,
    ) -> Result<products::Model, ServiceError> {
        Self::check_dimensions(&create)?;
        self.ensure_sku_free(&create.sku, None).await?;

        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(create.sku),
            name: Set(create.name),
            description: Set(create.description),
            width: Set(create.width),
            height: Set(create.height),
            length: Set(create.length),
            weight: Set(create.weight),
            volume: Set(create.volume),
            unit: Set(create.unit),
            default_price: Set(create.default_price),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let product = product.insert(&*self.db).await?;

        info!("Product {} ({}) created", product.id, product.sku);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<products::Model, ServiceError> {
        ProductEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<products::Model>, u64), ServiceError> {
        let paginator = ProductEntity::find()
            .order_by_asc(products::Column::Sku)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((products, total))
    }

    /// Price changes here never touch existing orders: items snapshot their
    /// unit price at order time.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: Uuid,
        update: UpdateProduct,
    ) -> Result<products::Model, ServiceError> {
        let product = self.get_product(id).await?;

        if let Some(sku) = &update.sku {
            self.ensure_sku_free(sku, Some(id)).await?;
        }
        for (label, value) in [
            ("volume", update.volume),
            ("default_price", update.default_price),
        ] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(format!(
                        "{} must not be negative, got {}",
                        label, v
                    )));
                }
            }
        }

        let mut active: products::ActiveModel = product.into();
        if let Some(sku) = update.sku {
            active.sku = Set(sku);
        }
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(volume) = update.volume {
            active.volume = Set(Some(volume));
        }
        if let Some(unit) = update.unit {
            active.unit = Set(Some(unit));
        }
        if let Some(price) = update.default_price {
            active.default_price = Set(Some(price));
        }
        if let Some(is_active) = update.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db).await?)
    }

    /// Products referenced by order items are order history; deleting them
    /// is rejected.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(id).await?;

        let item_count = ItemEntity::find()
            .filter(purchase_order_items::Column::ProductId.eq(id))
            .count(&*self.db)
            .await?;
        if item_count > 0 {
            return Err(ServiceError::InvalidReference(format!(
                "product {} is referenced by {} purchase order item(s)",
                id, item_count
            )));
        }

        ProductEntity::delete_by_id(product.id)
            .exec(&*self.db)
            .await?;

        info!("Product {} deleted", id);
        Ok(())
    }
}
