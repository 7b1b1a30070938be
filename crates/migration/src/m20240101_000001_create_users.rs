//! Create `users` table.
//!
//! `username` and `email` carry UNIQUE constraints: the registration
//! existence check is not transactional, the constraint is the real guard.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(uuid(Users::Id).primary_key())
                    .col(string_len(Users::Username, 15).unique_key().not_null())
                    .col(string_len(Users::Email, 255).unique_key().not_null())
                    .col(string_len(Users::Password, 255).not_null())
                    .col(string_len(Users::Role, 16).not_null().default("client"))
                    .col(boolean(Users::AccountVerification).not_null().default(false))
                    .col(ColumnDef::new(Users::VerificationCode).string_len(6).null())
                    .col(ColumnDef::new(Users::VerificationCodeExpireAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Users::ResetToken).string_len(64).null())
                    .col(ColumnDef::new(Users::ResetTokenExpireAt).timestamp_with_time_zone().null())
                    .col(timestamp_with_time_zone(Users::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Users::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    Password,
    Role,
    AccountVerification,
    VerificationCode,
    VerificationCodeExpireAt,
    ResetToken,
    ResetTokenExpireAt,
    CreatedAt,
    UpdatedAt,
}
