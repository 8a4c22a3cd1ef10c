use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        purchase_orders::{self, Entity as OrderEntity},
        suppliers::{self, Entity as SupplierEntity},
    },
    errors::ServiceError,
};

#[derive(Debug, Clone)]
pub struct CreateSupplier {
    pub name: String,
    pub cnpj: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateSupplier {
    pub name: Option<String>,
    pub cnpj: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn ensure_cnpj_free(&self, cnpj: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query =
            SupplierEntity::find().filter(suppliers::Column::Cnpj.eq(cnpj.to_string()));
        if let Some(id) = except {
            query = query.filter(suppliers::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "a supplier with cnpj '{}' already exists",
                cnpj
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, create))]
    pub async fn create_supplier(
        &self,
        create: CreateSupplier,
    ) -> Result<suppliers::Model, ServiceError> {
        if let Some(cnpj) = &create.cnpj {
            self.ensure_cnpj_free(cnpj, None).await?;
        }

        let supplier = suppliers::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(create.name),
            cnpj: Set(create.cnpj),
            email: Set(create.email),
            address: Set(create.address),
            notes: Set(create.notes),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let supplier = supplier.insert(&*self.db).await?;

        info!("Supplier {} created", supplier.id);
        Ok(supplier)
    }

    #[instrument(skip(self))]
    pub async fn get_supplier(&self, id: Uuid) -> Result<suppliers::Model, ServiceError> {
        SupplierEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_suppliers(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<suppliers::Model>, u64), ServiceError> {
        let paginator = SupplierEntity::find()
            .order_by_asc(suppliers::Column::Name)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let suppliers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((suppliers, total))
    }

    #[instrument(skip(self, update))]
    pub async fn update_supplier(
        &self,
        id: Uuid,
        update: UpdateSupplier,
    ) -> Result<suppliers::Model, ServiceError> {
        let supplier = self.get_supplier(id).await?;

        if let Some(cnpj) = &update.cnpj {
            self.ensure_cnpj_free(cnpj, Some(id)).await?;
        }

        let mut active: suppliers::ActiveModel = supplier.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(cnpj) = update.cnpj {
            active.cnpj = Set(Some(cnpj));
        }
        if let Some(email) = update.email {
            active.email = Set(Some(email));
        }
        if let Some(address) = update.address {
            active.address = Set(Some(address));
        }
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db).await?)
    }

    /// Deleting a supplier that still owns purchase orders would leave
    /// dangling references, so it is rejected.
    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: Uuid) -> Result<(), ServiceError> {
        let supplier = self.get_supplier(id).await?;

        let order_count = OrderEntity::find()
            .filter(purchase_orders::Column::SupplierId.eq(id))
            .count(&*self.db)
            .await?;
        if order_count > 0 {
            return Err(ServiceError::InvalidReference(format!(
                "supplier {} is referenced by {} purchase order(s)",
                id, order_count
            )));
        }

        SupplierEntity::delete_by_id(supplier.id)
            .exec(&*self.db)
            .await?;

        info!("Supplier {} deleted", id);
        Ok(())
    }
}
