//! Create `orders` table.
//! One row per paid checkout session; `stripe_session_id` is unique so a
//! replayed success callback cannot create a second order.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(uuid(Orders::Id).primary_key())
                    .col(uuid(Orders::ClientId).not_null())
                    .col(uuid(Orders::FreelancerId).not_null())
                    .col(uuid(Orders::ServiceId).not_null())
                    .col(decimal_len(Orders::Amount, 12, 2).not_null())
                    .col(string_len(Orders::Status, 32).not_null())
                    .col(string_len(Orders::StripeSessionId, 255).unique_key().not_null())
                    .col(timestamp_with_time_zone(Orders::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_client")
                            .from(Orders::Table, Orders::ClientId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_freelancer")
                            .from(Orders::Table, Orders::FreelancerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_service")
                            .from(Orders::Table, Orders::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    ClientId,
    FreelancerId,
    ServiceId,
    Amount,
    Status,
    StripeSessionId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users { Table, Id }

#[derive(DeriveIden)]
enum Services { Table, Id }
