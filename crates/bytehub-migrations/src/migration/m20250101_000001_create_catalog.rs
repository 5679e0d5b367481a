use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========================================
        // NAMESPACES TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(Namespaces::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Namespaces::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Namespaces::Name)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Namespaces::Description).text().null())
                    .col(ColumnDef::new(Namespaces::Url).text().not_null())
                    .col(ColumnDef::new(Namespaces::StorageOptions).json().null())
                    .col(ColumnDef::new(Namespaces::Meta).json().null())
                    .col(
                        ColumnDef::new(Namespaces::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Namespaces::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // FEATURES TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(Features::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Features::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Features::Namespace)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Features::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Features::Description).text().null())
                    .col(
                        ColumnDef::new(Features::Partition)
                            .string_len(32)
                            .not_null()
                            .default("date"),
                    )
                    .col(ColumnDef::new(Features::Meta).json().null())
                    .col(
                        ColumnDef::new(Features::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Features::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_features_namespace")
                            .from(Features::Table, Features::Namespace)
                            .to(Namespaces::Table, Namespaces::Name)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // A feature name is unique within its namespace
        manager
            .create_index(
                Index::create()
                    .name("idx_features_namespace_name_unique")
                    .table(Features::Table)
                    .col(Features::Namespace)
                    .col(Features::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_features_name")
                    .table(Features::Table)
                    .col(Features::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Indexes are dropped together with their tables
        manager
            .drop_table(Table::drop().table(Features::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Namespaces::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Namespaces {
    Table,
    Id,
    Name,
    Description,
    Url,
    StorageOptions,
    Meta,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Features {
    Table,
    Id,
    Namespace,
    Name,
    Description,
    Partition,
    Meta,
    CreatedAt,
    UpdatedAt,
}
