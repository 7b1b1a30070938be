use chrono::{DateTime, Utc};
use models::user;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::domain::{AuthUser, NewAccount, StoredUser};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, AuthError> {
        Ok(user::find_by_id(&self.db, id).await?.map(StoredUser::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, AuthError> {
        Ok(user::find_by_email(&self.db, email).await?.map(StoredUser::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, AuthError> {
        Ok(user::find_by_username(&self.db, username).await?.map(StoredUser::from))
    }

    async fn find_by_login(&self, username: Option<&str>, email: Option<&str>) -> Result<Option<StoredUser>, AuthError> {
        Ok(user::find_by_username_or_email(&self.db, username, email).await?.map(StoredUser::from))
    }

    async fn create_user(&self, account: NewAccount) -> Result<StoredUser, AuthError> {
        let created = user::create(
            &self.db,
            user::NewUser {
                username: account.username,
                email: account.email,
                password_hash: account.password_hash,
                verification_code: account.verification_code,
                verification_code_expire_at: account.verification_code_expires_at.into(),
            },
        )
        .await?;
        Ok(created.into())
    }

    async fn find_by_verification_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<StoredUser>, AuthError> {
        Ok(user::find_by_verification_code(&self.db, code, now.into()).await?.map(StoredUser::from))
    }

    async fn complete_verification(&self, user_id: Uuid, code: &str) -> Result<Option<AuthUser>, AuthError> {
        Ok(user::complete_verification(&self.db, user_id, code).await?.map(AuthUser::from))
    }

    async fn set_reset_token(&self, user_id: Uuid, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        user::set_reset_token(&self.db, user_id, token, expires_at.into()).await?;
        Ok(())
    }

    async fn find_by_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<StoredUser>, AuthError> {
        Ok(user::find_by_reset_token(&self.db, token, now.into()).await?.map(StoredUser::from))
    }

    async fn consume_reset_token(&self, user_id: Uuid, token: &str, password_hash: &str) -> Result<bool, AuthError> {
        Ok(user::consume_reset_token(&self.db, user_id, token, password_hash).await?)
    }
}
