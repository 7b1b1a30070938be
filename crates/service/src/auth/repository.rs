use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{AuthUser, NewAccount, StoredUser};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
///
/// `create_user` must reject duplicate usernames/emails with [`AuthError::Conflict`] at insert
/// time. The two `complete_*`/`consume_*` calls are compare-and-set on the stored secret.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, AuthError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, AuthError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, AuthError>;
    /// `username = ? OR email = ?`
    async fn find_by_login(&self, username: Option<&str>, email: Option<&str>) -> Result<Option<StoredUser>, AuthError>;
    async fn create_user(&self, account: NewAccount) -> Result<StoredUser, AuthError>;

    async fn find_by_verification_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<StoredUser>, AuthError>;
    /// Returns `None` if the row no longer holds `code`.
    async fn complete_verification(&self, user_id: Uuid, code: &str) -> Result<Option<AuthUser>, AuthError>;

    async fn set_reset_token(&self, user_id: Uuid, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError>;
    async fn find_by_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<StoredUser>, AuthError>;
    /// Returns `false` if the row no longer holds `token`.
    async fn consume_reset_token(&self, user_id: Uuid, token: &str, password_hash: &str) -> Result<bool, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use models::user::Role;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<Uuid, StoredUser>>, // key: user id
    }

    impl MockAuthRepository {
        fn find_where(&self, pred: impl Fn(&StoredUser) -> bool) -> Option<StoredUser> {
            self.users.lock().unwrap().values().find(|u| pred(u)).cloned()
        }

        /// Pending verification code for `email`, as the mail would carry it.
        pub fn verification_code_for(&self, email: &str) -> Option<String> {
            self.find_where(|u| u.user.email == email).and_then(|u| u.verification_code)
        }

        pub fn reset_token_for(&self, email: &str) -> Option<String> {
            self.find_where(|u| u.user.email == email).and_then(|u| u.reset_token)
        }

        pub fn password_hash_for(&self, email: &str) -> Option<String> {
            self.find_where(|u| u.user.email == email).map(|u| u.password_hash)
        }

        /// Move both one-time secrets of `email` into the past.
        pub fn expire_secrets(&self, email: &str) {
            let past = Utc::now() - chrono::Duration::minutes(1);
            for u in self.users.lock().unwrap().values_mut().filter(|u| u.user.email == email) {
                u.verification_code_expires_at = u.verification_code_expires_at.map(|_| past);
                u.reset_token_expires_at = u.reset_token_expires_at.map(|_| past);
            }
        }

        pub fn set_role(&self, email: &str, role: Role) {
            for u in self.users.lock().unwrap().values_mut().filter(|u| u.user.email == email) {
                u.user.role = role;
            }
        }

        pub fn remove(&self, id: Uuid) -> bool {
            self.users.lock().unwrap().remove(&id).is_some()
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, AuthError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, AuthError> {
            Ok(self.find_where(|u| u.user.email == email))
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, AuthError> {
            Ok(self.find_where(|u| u.user.username == username))
        }

        async fn find_by_login(&self, username: Option<&str>, email: Option<&str>) -> Result<Option<StoredUser>, AuthError> {
            Ok(self.find_where(|u| {
                username.map_or(false, |n| u.user.username == n) || email.map_or(false, |e| u.user.email == e)
            }))
        }

        async fn create_user(&self, account: NewAccount) -> Result<StoredUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.user.email == account.email) {
                return Err(AuthError::Conflict("Email already exists".into()));
            }
            if users.values().any(|u| u.user.username == account.username) {
                return Err(AuthError::Conflict("Username already exists".into()));
            }
            let stored = StoredUser {
                user: AuthUser {
                    id: Uuid::new_v4(),
                    username: account.username,
                    email: account.email,
                    role: Role::Client,
                    account_verification: false,
                    created_at: Utc::now(),
                },
                password_hash: account.password_hash,
                verification_code: Some(account.verification_code),
                verification_code_expires_at: Some(account.verification_code_expires_at),
                reset_token: None,
                reset_token_expires_at: None,
            };
            users.insert(stored.user.id, stored.clone());
            Ok(stored)
        }

        async fn find_by_verification_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<StoredUser>, AuthError> {
            Ok(self.find_where(|u| {
                u.verification_code.as_deref() == Some(code) && u.verification_code_expires_at.map_or(false, |t| t > now)
            }))
        }

        async fn complete_verification(&self, user_id: Uuid, code: &str) -> Result<Option<AuthUser>, AuthError> {
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&user_id) {
                Some(u) if u.verification_code.as_deref() == Some(code) => {
                    u.user.account_verification = true;
                    u.verification_code = None;
                    u.verification_code_expires_at = None;
                    Ok(Some(u.user.clone()))
                }
                _ => Ok(None),
            }
        }

        async fn set_reset_token(&self, user_id: Uuid, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
            if let Some(u) = self.users.lock().unwrap().get_mut(&user_id) {
                u.reset_token = Some(token.to_string());
                u.reset_token_expires_at = Some(expires_at);
            }
            Ok(())
        }

        async fn find_by_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<StoredUser>, AuthError> {
            Ok(self.find_where(|u| {
                u.reset_token.as_deref() == Some(token) && u.reset_token_expires_at.map_or(false, |t| t > now)
            }))
        }

        async fn consume_reset_token(&self, user_id: Uuid, token: &str, password_hash: &str) -> Result<bool, AuthError> {
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&user_id) {
                Some(u) if u.reset_token.as_deref() == Some(token) => {
                    u.password_hash = password_hash.to_string();
                    u.reset_token = None;
                    u.reset_token_expires_at = None;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }
}
