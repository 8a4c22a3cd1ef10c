use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_suppliers_table::Migration),
            Box::new(m20260101_000002_create_products_table::Migration),
            Box::new(m20260101_000003_create_warehouse_locations_table::Migration),
            Box::new(m20260101_000004_create_purchase_orders_table::Migration),
            Box::new(m20260101_000005_create_purchase_order_items_table::Migration),
            Box::new(m20260101_000006_create_stock_movements_table::Migration),
        ]
    }
}

// Migration implementations

mod m20260101_000001_create_suppliers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_suppliers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::Cnpj).string().null())
                        .col(ColumnDef::new(Suppliers::Email).string().null())
                        .col(ColumnDef::new(Suppliers::Address).string().null())
                        .col(ColumnDef::new(Suppliers::Notes).string().null())
                        .col(ColumnDef::new(Suppliers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Suppliers::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_suppliers_cnpj")
                        .table(Suppliers::Table)
                        .col(Suppliers::Cnpj)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Suppliers {
        Table,
        Id,
        Name,
        Cnpj,
        Email,
        Address,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000002_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).string().null())
                        .col(ColumnDef::new(Products::Width).decimal().null())
                        .col(ColumnDef::new(Products::Height).decimal().null())
                        .col(ColumnDef::new(Products::Length).decimal().null())
                        .col(ColumnDef::new(Products::Weight).decimal().null())
                        .col(ColumnDef::new(Products::Volume).decimal().null())
                        .col(ColumnDef::new(Products::Unit).string().null())
                        .col(ColumnDef::new(Products::DefaultPrice).decimal().null())
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        Sku,
        Name,
        Description,
        Width,
        Height,
        Length,
        Weight,
        Volume,
        Unit,
        DefaultPrice,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_warehouse_locations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_warehouse_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseLocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::Code)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::Description)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::CapacityVolume)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::UsedVolume)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_locations_code")
                        .table(WarehouseLocations::Table)
                        .col(WarehouseLocations::Code)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseLocations::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum WarehouseLocations {
        Table,
        Id,
        Code,
        Description,
        CapacityVolume,
        UsedVolume,
    }
}

mod m20260101_000004_create_purchase_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_purchase_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::Code).string().null())
                        .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::OrderDate).date().not_null())
                        .col(ColumnDef::new(PurchaseOrders::ExpectedDate).date().null())
                        .col(ColumnDef::new(PurchaseOrders::DeliveryDate).date().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::FullyReceived)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(PurchaseOrders::Notes).string().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_orders_supplier")
                                .from(PurchaseOrders::Table, PurchaseOrders::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_purchase_orders_code")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::Code)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_purchase_orders_status")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::Status)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PurchaseOrders {
        Table,
        Id,
        Code,
        SupplierId,
        OrderDate,
        ExpectedDate,
        DeliveryDate,
        Status,
        TotalAmount,
        FullyReceived,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Suppliers {
        Table,
        Id,
    }
}

mod m20260101_000005_create_purchase_order_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_purchase_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::OrderedQuantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::ReceivedQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Description)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderItems::LocationId).uuid().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_items_order")
                                .from(
                                    PurchaseOrderItems::Table,
                                    PurchaseOrderItems::PurchaseOrderId,
                                )
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_items_product")
                                .from(PurchaseOrderItems::Table, PurchaseOrderItems::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_items_location")
                                .from(PurchaseOrderItems::Table, PurchaseOrderItems::LocationId)
                                .to(WarehouseLocations::Table, WarehouseLocations::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_purchase_order_items_order")
                        .table(PurchaseOrderItems::Table)
                        .col(PurchaseOrderItems::PurchaseOrderId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PurchaseOrderItems {
        Table,
        Id,
        PurchaseOrderId,
        ProductId,
        OrderedQuantity,
        ReceivedQuantity,
        UnitPrice,
        Description,
        LocationId,
    }

    #[derive(Iden)]
    enum PurchaseOrders {
        Table,
        Id,
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
    }

    #[derive(Iden)]
    enum WarehouseLocations {
        Table,
        Id,
    }
}

mod m20260101_000006_create_stock_movements_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000006_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::OccurredAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Reference).string().null())
                        .col(ColumnDef::new(StockMovements::LocationId).uuid().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_product")
                                .from(StockMovements::Table, StockMovements::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_location")
                                .from(StockMovements::Table, StockMovements::LocationId)
                                .to(WarehouseLocations::Table, WarehouseLocations::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_location")
                        .table(StockMovements::Table)
                        .col(StockMovements::LocationId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockMovements {
        Table,
        Id,
        ProductId,
        Quantity,
        MovementType,
        OccurredAt,
        Reference,
        LocationId,
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
    }

    #[derive(Iden)]
    enum WarehouseLocations {
        Table,
        Id,
    }
}
