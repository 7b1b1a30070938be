//! Paid orders (`orders` table).
use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ModelError, service_listing};

pub const STATUS_PAID: &str = "Paid";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub service_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub status: String,
    #[sea_orm(unique)]
    pub stripe_session_id: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Service,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Service => Entity::belongs_to(service_listing::Entity)
                .from(Column::ServiceId)
                .to(service_listing::Column::Id)
                .into(),
        }
    }
}

impl Related<service_listing::Entity> for Entity {
    fn to() -> RelationDef { Relation::Service.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub service_id: Uuid,
    pub amount: Decimal,
    pub stripe_session_id: String,
}

pub async fn create(db: &DatabaseConnection, input: NewOrder) -> Result<Model, ModelError> {
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(input.client_id),
        freelancer_id: Set(input.freelancer_id),
        service_id: Set(input.service_id),
        amount: Set(input.amount),
        status: Set(STATUS_PAID.to_string()),
        stripe_session_id: Set(input.stripe_session_id),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_session(db: &DatabaseConnection, session_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::StripeSessionId.eq(session_id)).one(db).await?)
}

/// Orders joined with their listing, newest first.
pub async fn list_with_service(
    db: &DatabaseConnection,
    column: Column,
    user_id: Uuid,
) -> Result<Vec<(Model, service_listing::Model)>, ModelError> {
    let rows = Entity::find()
        .filter(column.eq(user_id))
        .find_also_related(service_listing::Entity)
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(o, s)| s.map(|s| (o, s))).collect())
}

pub async fn list_for_client(db: &DatabaseConnection, client_id: Uuid) -> Result<Vec<(Model, service_listing::Model)>, ModelError> {
    list_with_service(db, Column::ClientId, client_id).await
}

pub async fn list_for_freelancer(db: &DatabaseConnection, freelancer_id: Uuid) -> Result<Vec<(Model, service_listing::Model)>, ModelError> {
    list_with_service(db, Column::FreelancerId, freelancer_id).await
}
