use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Lookups by one-time secrets
        manager
            .create_index(
                Index::create()
                    .name("idx_users_verification_code")
                    .table(Users::Table)
                    .col(Users::VerificationCode)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_users_reset_token")
                    .table(Users::Table)
                    .col(Users::ResetToken)
                    .to_owned(),
            )
            .await?;

        // Services: category filter, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_services_category_created")
                    .table(Services::Table)
                    .col(Services::Category)
                    .col(Services::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Orders: per client / per freelancer listings
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_client")
                    .table(Orders::Table)
                    .col(Orders::ClientId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_freelancer")
                    .table(Orders::Table)
                    .col(Orders::FreelancerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_orders_freelancer").table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_orders_client").table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_services_category_created").table(Services::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_users_reset_token").table(Users::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_users_verification_code").table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users { Table, VerificationCode, ResetToken }

#[derive(DeriveIden)]
enum Services { Table, Category, CreatedAt }

#[derive(DeriveIden)]
enum Orders { Table, ClientId, FreelancerId }
