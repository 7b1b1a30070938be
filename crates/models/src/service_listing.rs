//! Freelance service listings (`services` table).
use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ModelError, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub category: String,
    pub images: Vec<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Owner,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Owner => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::Owner.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub images: Vec<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

pub fn validate_price(price: Decimal) -> Result<(), ModelError> {
    if price <= Decimal::ZERO {
        return Err(ModelError::Validation("price must be positive".into()));
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, input: NewListing) -> Result<Model, ModelError> {
    validate_price(input.price)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(input.user_id),
        title: Set(input.title),
        description: Set(input.description),
        price: Set(input.price),
        category: Set(input.category),
        images: Set(input.images),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Newest first, optionally filtered by category.
pub async fn list(
    db: &DatabaseConnection,
    category: Option<&str>,
    page_idx: u64,
    per_page: u64,
) -> Result<(Vec<Model>, u64), ModelError> {
    let mut query = Entity::find();
    if let Some(c) = category {
        query = query.filter(Column::Category.eq(c));
    }
    let paginator = query.order_by_desc(Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok((items, total))
}

pub async fn update(db: &DatabaseConnection, existing: Model, changes: ListingChanges) -> Result<Model, ModelError> {
    if let Some(price) = changes.price {
        validate_price(price)?;
    }
    let mut am: ActiveModel = existing.into();
    if let Some(v) = changes.title { am.title = Set(v); }
    if let Some(v) = changes.description { am.description = Set(v); }
    if let Some(v) = changes.price { am.price = Set(v); }
    if let Some(v) = changes.category { am.category = Set(v); }
    if let Some(v) = changes.images { am.images = Set(v); }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<bool, ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_must_be_positive() {
        assert!(validate_price(Decimal::ZERO).is_err());
        assert!(validate_price(Decimal::new(-100, 2)).is_err());
        assert!(validate_price(Decimal::new(4999, 2)).is_ok());
    }
}
