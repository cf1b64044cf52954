use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_customers_table::Migration),
            Box::new(m20240301_000002_create_products_table::Migration),
            Box::new(m20240301_000003_create_orders_table::Migration),
            Box::new(m20240301_000004_create_order_items_table::Migration),
            Box::new(m20240301_000005_create_users_table::Migration),
            Box::new(m20240301_000006_create_sessions_table::Migration),
            Box::new(m20240301_000007_create_user_activity_logs_table::Migration),
        ]
    }
}

async fn create_index(
    manager: &SchemaManager<'_>,
    name: &str,
    table: impl IntoIden + 'static,
    col: impl IntoIden + 'static,
    unique: bool,
) -> Result<(), DbErr> {
    let mut index = Index::create();
    index.if_not_exists().name(name).table(table).col(col);
    if unique {
        index.unique();
    }
    manager.create_index(index.to_owned()).await
}

mod m20240301_000001_create_customers_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_customers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::BusinessName).string_len(200).not_null())
                        .col(ColumnDef::new(Customers::ContactName).string_len(200).null())
                        .col(ColumnDef::new(Customers::Email).string_len(255).not_null())
                        .col(ColumnDef::new(Customers::Phone).string_len(50).null())
                        .col(ColumnDef::new(Customers::Address).string().null())
                        .col(ColumnDef::new(Customers::City).string_len(120).null())
                        .col(ColumnDef::new(Customers::BusinessType).string_len(32).not_null())
                        .col(ColumnDef::new(Customers::TaxId).string_len(64).null())
                        .col(ColumnDef::new(Customers::Notes).text().null())
                        .col(
                            ColumnDef::new(Customers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(manager, "idx_customers_email", Customers::Table, Customers::Email, true)
                .await?;
            create_index(
                manager,
                "idx_customers_business_type",
                Customers::Table,
                Customers::BusinessType,
                false,
            )
            .await?;
            create_index(manager, "idx_customers_city", Customers::Table, Customers::City, false)
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Customers {
        Table,
        Id,
        BusinessName,
        ContactName,
        Email,
        Phone,
        Address,
        City,
        BusinessType,
        TaxId,
        Notes,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_products_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_products_table"
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
                        .col(ColumnDef::new(Products::Sku).string_len(64).not_null())
                        .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Category).string_len(32).not_null())
                        .col(ColumnDef::new(Products::Brand).string_len(120).null())
                        .col(ColumnDef::new(Products::VolumeMl).integer().null())
                        .col(
                            ColumnDef::new(Products::UnitsPerCase)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(manager, "idx_products_sku", Products::Table, Products::Sku, true).await?;
            create_index(
                manager,
                "idx_products_category",
                Products::Table,
                Products::Category,
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Products {
        Table,
        Id,
        Sku,
        Name,
        Description,
        Category,
        Brand,
        VolumeMl,
        UnitsPerCase,
        Price,
        IsActive,
        ImageUrl,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_orders_table {
    use super::create_index;
    use super::m20240301_000001_create_customers_table::Customers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::Source).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::RequestedDeliveryDate).date().null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_customer_id")
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_orders_order_number",
                Orders::Table,
                Orders::OrderNumber,
                true,
            )
            .await?;
            create_index(manager, "idx_orders_customer_id", Orders::Table, Orders::CustomerId, false)
                .await?;
            create_index(manager, "idx_orders_status", Orders::Table, Orders::Status, false).await?;
            create_index(manager, "idx_orders_created_at", Orders::Table, Orders::CreatedAt, false)
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        Status,
        Source,
        Notes,
        RequestedDeliveryDate,
        TotalAmount,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_order_items_table {
    use super::create_index;
    use super::m20240301_000002_create_products_table::Products;
    use super::m20240301_000003_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(OrderItems::LineTotal).decimal_len(14, 2).not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_product_id")
                                .from(OrderItems::Table, OrderItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_order_items_order_id",
                OrderItems::Table,
                OrderItems::OrderId,
                false,
            )
            .await?;
            create_index(
                manager,
                "idx_order_items_product_id",
                OrderItems::Table,
                OrderItems::ProductId,
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        UnitPrice,
        LineTotal,
    }
}

mod m20240301_000005_create_users_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string_len(120).not_null())
                        .col(ColumnDef::new(Users::Email).string_len(255).not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::LastLoginAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(manager, "idx_users_email", Users::Table, Users::Email, true).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        IsActive,
        LastLoginAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000006_create_sessions_table {
    use super::create_index;
    use super::m20240301_000005_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_sessions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sessions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sessions::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                        .col(ColumnDef::new(Sessions::TokenHash).string_len(64).not_null())
                        .col(ColumnDef::new(Sessions::IpAddress).string_len(64).null())
                        .col(ColumnDef::new(Sessions::UserAgent).string().null())
                        .col(
                            ColumnDef::new(Sessions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sessions::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sessions_user_id")
                                .from(Sessions::Table, Sessions::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_sessions_token_hash",
                Sessions::Table,
                Sessions::TokenHash,
                true,
            )
            .await?;
            create_index(
                manager,
                "idx_sessions_expires_at",
                Sessions::Table,
                Sessions::ExpiresAt,
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sessions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sessions {
        Table,
        Id,
        UserId,
        TokenHash,
        IpAddress,
        UserAgent,
        CreatedAt,
        ExpiresAt,
    }
}

mod m20240301_000007_create_user_activity_logs_table {
    use super::create_index;
    use super::m20240301_000005_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000007_create_user_activity_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(UserActivityLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UserActivityLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UserActivityLogs::UserId).uuid().null())
                        .col(ColumnDef::new(UserActivityLogs::UserEmail).string_len(255).null())
                        .col(ColumnDef::new(UserActivityLogs::Action).string_len(16).not_null())
                        .col(
                            ColumnDef::new(UserActivityLogs::EntityType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(UserActivityLogs::EntityId).string_len(64).null())
                        .col(ColumnDef::new(UserActivityLogs::Details).json().null())
                        .col(ColumnDef::new(UserActivityLogs::IpAddress).string_len(64).null())
                        .col(
                            ColumnDef::new(UserActivityLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_activity_logs_user_id")
                                .from(UserActivityLogs::Table, UserActivityLogs::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_user_activity_logs_created_at",
                UserActivityLogs::Table,
                UserActivityLogs::CreatedAt,
                false,
            )
            .await?;
            create_index(
                manager,
                "idx_user_activity_logs_user_id",
                UserActivityLogs::Table,
                UserActivityLogs::UserId,
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserActivityLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum UserActivityLogs {
        Table,
        Id,
        UserId,
        UserEmail,
        Action,
        EntityType,
        EntityId,
        Details,
        IpAddress,
        CreatedAt,
    }
}
