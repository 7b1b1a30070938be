//! Admin user management.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use models::user::{self, Role};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::domain::AuthUser;
use crate::errors::ServiceError;
use crate::pagination::Pagination;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<AuthUser>,
    pub total_users: u64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Newest first, skipping `exclude`.
    async fn list_excluding(&self, exclude: Uuid, page_idx: u64, per_page: u64) -> Result<(Vec<AuthUser>, u64), ServiceError>;
    async fn find(&self, id: Uuid) -> Result<Option<AuthUser>, ServiceError>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<AuthUser>, ServiceError>;
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;
}

pub struct SeaOrmUserRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn list_excluding(&self, exclude: Uuid, page_idx: u64, per_page: u64) -> Result<(Vec<AuthUser>, u64), ServiceError> {
        let (rows, total) = user::list_excluding(&self.db, exclude, page_idx, per_page).await?;
        Ok((rows.into_iter().map(AuthUser::from).collect(), total))
    }

    async fn find(&self, id: Uuid) -> Result<Option<AuthUser>, ServiceError> {
        Ok(user::find_by_id(&self.db, id).await?.map(AuthUser::from))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<AuthUser>, ServiceError> {
        Ok(user::set_role(&self.db, id, role).await?.map(AuthUser::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(user::hard_delete(&self.db, id).await?)
    }
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self { Self { repo } }

    #[instrument(skip(self))]
    pub async fn list(&self, caller: Uuid, page: Pagination) -> Result<UserPage, ServiceError> {
        let (idx, per) = page.normalize();
        let (users, total_users) = self.repo.list_excluding(caller, idx, per).await?;
        if users.is_empty() {
            return Err(ServiceError::NotFound("No users found".into()));
        }
        Ok(UserPage { users, total_users })
    }

    pub async fn get(&self, id: Uuid) -> Result<AuthUser, ServiceError> {
        self.repo.find(id).await?.ok_or_else(|| ServiceError::NotFound("User not found".into()))
    }

    #[instrument(skip(self))]
    pub async fn change_role(&self, id: Uuid, role: &str) -> Result<AuthUser, ServiceError> {
        let role = Role::from_str(role.trim())?;
        let updated = self
            .repo
            .set_role(id, role)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".into()))?;
        info!(user_id = %id, role = %role, "user_role_changed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound("User not found".into()));
        }
        info!(user_id = %id, "user_deleted");
        Ok(())
    }
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Vector-backed store; insertion order doubles as creation order.
    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<Vec<AuthUser>>,
    }

    impl MockUserRepository {
        pub fn insert(&self, user: AuthUser) {
            self.users.lock().unwrap().push(user);
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn list_excluding(&self, exclude: Uuid, page_idx: u64, per_page: u64) -> Result<(Vec<AuthUser>, u64), ServiceError> {
            let users = self.users.lock().unwrap();
            let mut rest: Vec<AuthUser> = users.iter().filter(|u| u.id != exclude).cloned().collect();
            rest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = rest.len() as u64;
            let page = rest.into_iter().skip((page_idx * per_page) as usize).take(per_page as usize).collect();
            Ok((page, total))
        }

        async fn find(&self, id: Uuid) -> Result<Option<AuthUser>, ServiceError> {
            Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<AuthUser>, ServiceError> {
            let mut users = self.users.lock().unwrap();
            Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
                u.role = role;
                u.clone()
            }))
        }

        async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
            let mut users = self.users.lock().unwrap();
            let before = users.len();
            users.retain(|u| u.id != id);
            Ok(users.len() < before)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockUserRepository;
    use super::*;
    use chrono::{Duration, Utc};

    fn user(name: &str, age_mins: i64) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: name.into(),
            email: format!("{}@x.com", name),
            role: Role::Client,
            account_verification: true,
            created_at: Utc::now() - Duration::minutes(age_mins),
        }
    }

    fn service_with(users: &[AuthUser]) -> UserService {
        let repo = MockUserRepository::default();
        for u in users {
            repo.insert(u.clone());
        }
        UserService::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn list_excludes_caller_newest_first() {
        let admin = user("admin", 30);
        let old = user("old", 20);
        let new = user("new", 1);
        let svc = service_with(&[admin.clone(), old, new]);

        let page = svc.list(admin.id, Pagination { page: 1, per_page: 10 }).await.unwrap();
        assert_eq!(page.total_users, 2);
        let names: Vec<_> = page.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["new", "old"]);
    }

    #[tokio::test]
    async fn empty_page_is_not_found() {
        let admin = user("admin", 0);
        let svc = service_with(&[admin.clone()]);
        let err = svc.list(admin.id, Pagination::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "No users found");
    }

    #[tokio::test]
    async fn change_role_validates_value() {
        let u = user("bob", 0);
        let svc = service_with(&[u.clone()]);
        assert_eq!(svc.change_role(u.id, "freelancer").await.unwrap().role, Role::Freelancer);
        assert!(matches!(svc.change_role(u.id, "root").await, Err(ServiceError::Validation(ref m)) if m == "Invalid role"));
        assert!(matches!(svc.change_role(Uuid::new_v4(), "admin").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let u = user("bob", 0);
        let svc = service_with(&[u.clone()]);
        svc.delete(u.id).await.unwrap();
        assert!(matches!(svc.delete(u.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.get(u.id).await, Err(ServiceError::NotFound(_))));
    }
}
