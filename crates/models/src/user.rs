use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::prelude::*, Condition, DatabaseConnection, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "client")]
    Client,
    #[sea_orm(string_value = "freelancer")]
    Freelancer,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Freelancer => "freelancer",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self { Role::Client }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "freelancer" => Ok(Role::Freelancer),
            "admin" => Ok(Role::Admin),
            _ => Err(ModelError::Validation("Invalid role".into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub account_verification: bool,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    #[serde(skip_serializing)]
    pub verification_code_expire_at: Option<DateTimeWithTimeZone>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expire_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Row to insert at registration; the account starts unverified.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verification_code: String,
    pub verification_code_expire_at: DateTimeWithTimeZone,
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(email)).one(db).await?)
}

pub async fn find_by_username(db: &DatabaseConnection, username: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Username.eq(username)).one(db).await?)
}

/// `username = ? OR email = ?`; either side may be absent.
pub async fn find_by_username_or_email(
    db: &DatabaseConnection,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<Model>, ModelError> {
    let mut cond = Condition::any();
    if let Some(u) = username {
        cond = cond.add(Column::Username.eq(u));
    }
    if let Some(e) = email {
        cond = cond.add(Column::Email.eq(e));
    }
    if cond.is_empty() {
        return Ok(None);
    }
    Ok(Entity::find().filter(cond).one(db).await?)
}

pub async fn create(db: &DatabaseConnection, input: NewUser) -> Result<Model, ModelError> {
    if !input.email.contains('@') {
        return Err(ModelError::Validation("invalid email".into()));
    }
    if input.password_hash.trim().is_empty() {
        return Err(ModelError::Validation("password hash required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(input.username),
        email: Set(input.email),
        password: Set(input.password_hash),
        role: Set(Role::Client),
        account_verification: Set(false),
        verification_code: Set(Some(input.verification_code)),
        verification_code_expire_at: Set(Some(input.verification_code_expire_at)),
        reset_token: Set(None),
        reset_token_expire_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_verification_code(
    db: &DatabaseConnection,
    code: &str,
    now: DateTimeWithTimeZone,
) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::VerificationCode.eq(code))
        .filter(Column::VerificationCodeExpireAt.gt(now))
        .one(db)
        .await?)
}

/// Mark verified and clear the code, only if the row still holds `code`.
/// Returns `None` when another request consumed it first.
pub async fn complete_verification(db: &DatabaseConnection, id: Uuid, code: &str) -> Result<Option<Model>, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::AccountVerification, Expr::value(true))
        .col_expr(Column::VerificationCode, Expr::value(Option::<String>::None))
        .col_expr(Column::VerificationCodeExpireAt, Expr::value(Option::<DateTimeWithTimeZone>::None))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::Id.eq(id))
        .filter(Column::VerificationCode.eq(code))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Ok(None);
    }
    find_by_id(db, id).await
}

pub async fn set_reset_token(
    db: &DatabaseConnection,
    id: Uuid,
    token: &str,
    expires_at: DateTimeWithTimeZone,
) -> Result<(), ModelError> {
    Entity::update_many()
        .col_expr(Column::ResetToken, Expr::value(Some(token.to_string())))
        .col_expr(Column::ResetTokenExpireAt, Expr::value(Some(expires_at)))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn find_by_reset_token(
    db: &DatabaseConnection,
    token: &str,
    now: DateTimeWithTimeZone,
) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ResetToken.eq(token))
        .filter(Column::ResetTokenExpireAt.gt(now))
        .one(db)
        .await?)
}

/// Store the new hash and clear the reset token, only if the row still holds `token`.
pub async fn consume_reset_token(
    db: &DatabaseConnection,
    id: Uuid,
    token: &str,
    password_hash: &str,
) -> Result<bool, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::Password, Expr::value(password_hash.to_string()))
        .col_expr(Column::ResetToken, Expr::value(Option::<String>::None))
        .col_expr(Column::ResetTokenExpireAt, Expr::value(Option::<DateTimeWithTimeZone>::None))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::Id.eq(id))
        .filter(Column::ResetToken.eq(token))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}

/// One page of users (newest first) excluding `exclude`, plus the total count.
pub async fn list_excluding(
    db: &DatabaseConnection,
    exclude: Uuid,
    page_idx: u64,
    per_page: u64,
) -> Result<(Vec<Model>, u64), ModelError> {
    let paginator = Entity::find()
        .filter(Column::Id.ne(exclude))
        .order_by_desc(Column::CreatedAt)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok((items, total))
}

pub async fn set_role(db: &DatabaseConnection, id: Uuid, role: Role) -> Result<Option<Model>, ModelError> {
    let Some(found) = Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut am: ActiveModel = found.into();
    am.role = Set(role);
    am.updated_at = Set(Utc::now().into());
    Ok(Some(am.update(db).await?))
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<bool, ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Client, Role::Freelancer, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Freelancer).unwrap(), "\"freelancer\"");
    }

    #[test]
    fn secrets_are_not_serialized() {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let m = Model {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password: "$argon2id$hash".into(),
            role: Role::Client,
            account_verification: false,
            verification_code: Some("123456".into()),
            verification_code_expire_at: Some(now),
            reset_token: None,
            reset_token_expire_at: None,
            created_at: now,
            updated_at: now,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert!(v.get("password").is_none());
        assert!(v.get("verification_code").is_none());
        assert_eq!(v["username"], "alice");
    }
}
