//! Create `services` table (freelance listings) with FK to `users`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(uuid(Services::Id).primary_key())
                    .col(uuid(Services::UserId).not_null())
                    .col(string_len(Services::Title, 255).not_null())
                    .col(text(Services::Description).not_null())
                    .col(decimal_len(Services::Price, 12, 2).not_null())
                    .col(string_len(Services::Category, 64).not_null())
                    .col(ColumnDef::new(Services::Images).array(ColumnType::Text).not_null())
                    .col(timestamp_with_time_zone(Services::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Services::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_services_user")
                            .from(Services::Table, Services::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Services::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Services {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Price,
    Category,
    Images,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users { Table, Id }
