//! Paid orders as seen by clients and freelancers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use models::order::{self, NewOrder};
use models::service_listing;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::ServiceError;

pub use models::order::Model as Order;

/// An order joined with the listing it paid for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub service_title: String,
    pub service_description: String,
    pub service_price: Decimal,
    pub service_images: Vec<String>,
}

impl From<(Order, service_listing::Model)> for OrderSummary {
    fn from((o, s): (Order, service_listing::Model)) -> Self {
        OrderSummary {
            id: o.id,
            amount: o.amount,
            status: o.status,
            created_at: o.created_at.with_timezone(&Utc),
            service_title: s.title,
            service_description: s.description,
            service_price: s.price,
            service_images: s.images,
        }
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fails with `Conflict` if the session already produced an order.
    async fn create(&self, input: NewOrder) -> Result<Order, ServiceError>;
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, ServiceError>;
    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError>;
    async fn list_for_freelancer(&self, freelancer_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError>;
}

pub struct SeaOrmOrderRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn create(&self, input: NewOrder) -> Result<Order, ServiceError> {
        Ok(order::create(&self.db, input).await?)
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, ServiceError> {
        Ok(order::find_by_session(&self.db, session_id).await?)
    }

    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        let rows = order::list_for_client(&self.db, client_id).await?;
        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }

    async fn list_for_freelancer(&self, freelancer_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        let rows = order::list_for_freelancer(&self.db, freelancer_id).await?;
        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }
}

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
}

fn non_empty(rows: Vec<OrderSummary>) -> Result<Vec<OrderSummary>, ServiceError> {
    if rows.is_empty() {
        return Err(ServiceError::NotFound("No orders found".into()));
    }
    Ok(rows)
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self { Self { repo } }

    pub async fn for_client(&self, client_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        non_empty(self.repo.list_for_client(client_id).await?)
    }

    pub async fn for_freelancer(&self, freelancer_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        non_empty(self.repo.list_for_freelancer(freelancer_id).await?)
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Orders in memory; listings can be registered so summaries have something to join.
    #[derive(Default)]
    pub struct MockOrderRepository {
        orders: Mutex<Vec<Order>>,
        listings: Mutex<HashMap<Uuid, service_listing::Model>>,
    }

    impl MockOrderRepository {
        pub fn add_listing(&self, listing: service_listing::Model) {
            self.listings.lock().unwrap().insert(listing.id, listing);
        }

        pub fn len(&self) -> usize { self.orders.lock().unwrap().len() }

        pub fn is_empty(&self) -> bool { self.len() == 0 }

        fn summaries(&self, pred: impl Fn(&Order) -> bool) -> Vec<OrderSummary> {
            let listings = self.listings.lock().unwrap();
            self.orders
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|o| pred(o))
                .filter_map(|o| listings.get(&o.service_id).map(|s| OrderSummary::from((o.clone(), s.clone()))))
                .collect()
        }
    }

    #[async_trait]
    impl OrderRepository for MockOrderRepository {
        async fn create(&self, input: NewOrder) -> Result<Order, ServiceError> {
            let mut orders = self.orders.lock().unwrap();
            if orders.iter().any(|o| o.stripe_session_id == input.stripe_session_id) {
                return Err(ServiceError::Conflict("Order already recorded".into()));
            }
            let row = Order {
                id: Uuid::new_v4(),
                client_id: input.client_id,
                freelancer_id: input.freelancer_id,
                service_id: input.service_id,
                amount: input.amount,
                status: order::STATUS_PAID.to_string(),
                stripe_session_id: input.stripe_session_id,
                created_at: Utc::now().into(),
            };
            orders.push(row.clone());
            Ok(row)
        }

        async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, ServiceError> {
            Ok(self.orders.lock().unwrap().iter().find(|o| o.stripe_session_id == session_id).cloned())
        }

        async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
            Ok(self.summaries(|o| o.client_id == client_id))
        }

        async fn list_for_freelancer(&self, freelancer_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
            Ok(self.summaries(|o| o.freelancer_id == freelancer_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockOrderRepository;
    use super::*;

    fn listing(owner: Uuid) -> service_listing::Model {
        let now = Utc::now().into();
        service_listing::Model {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "Logo design".into(),
            description: "Three concepts".into(),
            price: Decimal::new(4999, 2),
            category: "design".into(),
            images: vec!["https://images.test/services/img1.jpg".into()],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn orders_are_listed_per_side_with_listing_details() {
        let repo = Arc::new(MockOrderRepository::default());
        let freelancer = Uuid::new_v4();
        let client = Uuid::new_v4();
        let l = listing(freelancer);
        repo.add_listing(l.clone());
        repo.create(NewOrder {
            client_id: client,
            freelancer_id: freelancer,
            service_id: l.id,
            amount: l.price,
            stripe_session_id: "cs_1".into(),
        })
        .await
        .unwrap();

        let svc = OrderService::new(repo);
        let mine = svc.for_client(client).await.unwrap();
        assert_eq!(mine[0].service_title, "Logo design");
        assert_eq!(svc.for_freelancer(freelancer).await.unwrap().len(), 1);
        let err = svc.for_client(freelancer).await.unwrap_err();
        assert_eq!(err.to_string(), "No orders found");
    }

    #[tokio::test]
    async fn duplicate_session_is_a_conflict() {
        let repo = MockOrderRepository::default();
        let new = || NewOrder {
            client_id: Uuid::nil(),
            freelancer_id: Uuid::nil(),
            service_id: Uuid::nil(),
            amount: Decimal::ONE,
            stripe_session_id: "cs_dup".into(),
        };
        repo.create(new()).await.unwrap();
        assert!(matches!(repo.create(new()).await, Err(ServiceError::Conflict(_))));
    }
}
