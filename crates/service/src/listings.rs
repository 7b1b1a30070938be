//! Freelance service listings.

use std::sync::Arc;

use async_trait::async_trait;
use models::service_listing::{self, ListingChanges, NewListing};
use models::user::Role;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::media::{public_id_from_url, ImageHost};
use crate::pagination::Pagination;

pub use models::service_listing::Model as Listing;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub services: Vec<Listing>,
    pub total_services: u64,
    pub page: u32,
    pub limit: u32,
}

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn create(&self, input: NewListing) -> Result<Listing, ServiceError>;
    async fn find(&self, id: Uuid) -> Result<Option<Listing>, ServiceError>;
    async fn list(&self, category: Option<&str>, page_idx: u64, per_page: u64) -> Result<(Vec<Listing>, u64), ServiceError>;
    async fn update(&self, existing: Listing, changes: ListingChanges) -> Result<Listing, ServiceError>;
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;
}

pub struct SeaOrmListingRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl ListingRepository for SeaOrmListingRepository {
    async fn create(&self, input: NewListing) -> Result<Listing, ServiceError> {
        Ok(service_listing::create(&self.db, input).await?)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Listing>, ServiceError> {
        Ok(service_listing::find_by_id(&self.db, id).await?)
    }

    async fn list(&self, category: Option<&str>, page_idx: u64, per_page: u64) -> Result<(Vec<Listing>, u64), ServiceError> {
        Ok(service_listing::list(&self.db, category, page_idx, per_page).await?)
    }

    async fn update(&self, existing: Listing, changes: ListingChanges) -> Result<Listing, ServiceError> {
        Ok(service_listing::update(&self.db, existing, changes).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(service_listing::delete(&self.db, id).await?)
    }
}

pub struct ListingService {
    repo: Arc<dyn ListingRepository>,
    images: Arc<dyn ImageHost>,
    folder: String,
}

fn required(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ListingService {
    pub fn new(repo: Arc<dyn ListingRepository>, images: Arc<dyn ImageHost>, folder: impl Into<String>) -> Self {
        Self { repo, images, folder: folder.into() }
    }

    async fn upload_all(&self, sources: &[String]) -> Result<Vec<String>, ServiceError> {
        let mut urls = Vec::with_capacity(sources.len());
        for src in sources {
            let url = self
                .images
                .upload(src, &self.folder)
                .await
                .map_err(|e| ServiceError::Upstream(e.to_string()))?;
            urls.push(url);
        }
        Ok(urls)
    }

    /// Best-effort; failures are logged.
    async fn destroy_all(&self, urls: &[String]) {
        for url in urls {
            let Some(public_id) = public_id_from_url(url, &self.folder) else {
                continue;
            };
            if let Err(e) = self.images.destroy(&public_id).await {
                warn!(%public_id, error = %e, "image destroy failed");
            }
        }
    }

    async fn load(&self, id: Uuid) -> Result<Listing, ServiceError> {
        self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("Service"))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, owner: Uuid, input: CreateListingInput) -> Result<Listing, ServiceError> {
        let all_required = || ServiceError::Validation("All fields are required".into());
        let title = required(input.title).ok_or_else(all_required)?;
        let description = required(input.description).ok_or_else(all_required)?;
        let category = required(input.category).ok_or_else(all_required)?;
        let price = input.price.ok_or_else(all_required)?;
        let sources = input.images.ok_or_else(all_required)?;
        service_listing::validate_price(price)?;

        let images = self.upload_all(&sources).await?;
        let listing = self
            .repo
            .create(NewListing { user_id: owner, title, description, price, category, images })
            .await?;
        info!(listing_id = %listing.id, owner = %owner, "listing_created");
        Ok(listing)
    }

    pub async fn list(&self, category: Option<&str>, page: Pagination) -> Result<ListingPage, ServiceError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let (idx, per) = page.normalize();
        let (services, total_services) = self.repo.list(category, idx, per).await?;
        if services.is_empty() {
            return Err(ServiceError::NotFound("No services found".into()));
        }
        Ok(ListingPage { services, total_services, page: idx as u32 + 1, limit: per as u32 })
    }

    pub async fn get(&self, id: Uuid) -> Result<Listing, ServiceError> {
        self.load(id).await
    }

    /// Owner only. New images replace the old ones on the image host.
    #[instrument(skip(self, input))]
    pub async fn update(&self, actor: Uuid, id: Uuid, input: UpdateListingInput) -> Result<Listing, ServiceError> {
        let existing = self.load(id).await?;
        if existing.user_id != actor {
            return Err(ServiceError::Forbidden("You are not authorized to update this service".into()));
        }

        let images = match input.images {
            Some(sources) => {
                let fresh = self.upload_all(&sources).await?;
                self.destroy_all(&existing.images).await;
                Some(fresh)
            }
            None => None,
        };
        let changes = ListingChanges {
            title: required(input.title),
            description: required(input.description),
            price: input.price,
            category: required(input.category),
            images,
        };
        let updated = self.repo.update(existing, changes).await?;
        info!(listing_id = %id, "listing_updated");
        Ok(updated)
    }

    /// Owner or admin.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Uuid, actor_role: Role, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.load(id).await?;
        if existing.user_id != actor && actor_role != Role::Admin {
            return Err(ServiceError::Forbidden("You are not authorized to delete this service".into()));
        }
        self.destroy_all(&existing.images).await;
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("Service"));
        }
        info!(listing_id = %id, "listing_deleted");
        Ok(())
    }
}

pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockListingRepository {
        rows: Mutex<Vec<Listing>>,
    }

    #[async_trait]
    impl ListingRepository for MockListingRepository {
        async fn create(&self, input: NewListing) -> Result<Listing, ServiceError> {
            let now = Utc::now().into();
            let row = Listing {
                id: Uuid::new_v4(),
                user_id: input.user_id,
                title: input.title,
                description: input.description,
                price: input.price,
                category: input.category,
                images: input.images,
                created_at: now,
                updated_at: now,
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn find(&self, id: Uuid) -> Result<Option<Listing>, ServiceError> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn list(&self, category: Option<&str>, page_idx: u64, per_page: u64) -> Result<(Vec<Listing>, u64), ServiceError> {
            let rows = self.rows.lock().unwrap();
            // newest first: later inserts come first
            let matching: Vec<Listing> = rows
                .iter()
                .rev()
                .filter(|r| category.map_or(true, |c| r.category == c))
                .cloned()
                .collect();
            let total = matching.len() as u64;
            let page = matching.into_iter().skip((page_idx * per_page) as usize).take(per_page as usize).collect();
            Ok((page, total))
        }

        async fn update(&self, existing: Listing, changes: ListingChanges) -> Result<Listing, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.iter_mut().find(|r| r.id == existing.id).ok_or_else(|| ServiceError::not_found("Service"))?;
            if let Some(v) = changes.title { row.title = v; }
            if let Some(v) = changes.description { row.description = v; }
            if let Some(v) = changes.price { row.price = v; }
            if let Some(v) = changes.category { row.category = v; }
            if let Some(v) = changes.images { row.images = v; }
            row.updated_at = Utc::now().into();
            Ok(row.clone())
        }

        async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| r.id != id);
            Ok(rows.len() < before)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockListingRepository;
    use super::*;
    use crate::media::mock::RecordingImageHost;

    fn setup() -> (ListingService, Arc<RecordingImageHost>) {
        let images = Arc::new(RecordingImageHost::default());
        let svc = ListingService::new(Arc::new(MockListingRepository::default()), images.clone(), "services");
        (svc, images)
    }

    fn input(category: &str) -> CreateListingInput {
        CreateListingInput {
            title: Some("Logo design".into()),
            description: Some("Three concepts".into()),
            price: Some(Decimal::new(4999, 2)),
            category: Some(category.into()),
            images: Some(vec!["data:image/png;base64,AAAA".into()]),
        }
    }

    #[tokio::test]
    async fn create_uploads_images_and_stores_urls() {
        let (svc, images) = setup();
        let owner = Uuid::new_v4();
        let listing = svc.create(owner, input("design")).await.unwrap();
        assert_eq!(listing.user_id, owner);
        assert_eq!(listing.images, vec!["https://images.test/services/img1.jpg".to_string()]);
        assert_eq!(images.uploaded().len(), 1);
    }

    #[tokio::test]
    async fn create_requires_every_field() {
        let (svc, _) = setup();
        let mut missing = input("design");
        missing.title = Some("   ".into());
        let err = svc.create(Uuid::new_v4(), missing).await.unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");
    }

    #[tokio::test]
    async fn list_filters_by_category_and_reports_empty() {
        let (svc, _) = setup();
        let owner = Uuid::new_v4();
        svc.create(owner, input("design")).await.unwrap();
        svc.create(owner, input("writing")).await.unwrap();

        let page = svc.list(Some("design"), Pagination::default()).await.unwrap();
        assert_eq!(page.total_services, 1);
        assert_eq!(page.services[0].category, "design");
        assert!(matches!(svc.list(Some("music"), Pagination::default()).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn only_owner_may_update() {
        let (svc, images) = setup();
        let owner = Uuid::new_v4();
        let listing = svc.create(owner, input("design")).await.unwrap();

        let change = UpdateListingInput { title: Some("New title".into()), ..Default::default() };
        assert!(matches!(svc.update(Uuid::new_v4(), listing.id, change.clone()).await, Err(ServiceError::Forbidden(_))));

        let with_images = UpdateListingInput { images: Some(vec!["data:new".into()]), ..change };
        let updated = svc.update(owner, listing.id, with_images).await.unwrap();
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.images, vec!["https://images.test/services/img2.jpg".to_string()]);
        assert_eq!(images.destroyed(), vec!["services/img1".to_string()]);
    }

    #[tokio::test]
    async fn delete_checks_permission_before_destroying_images() {
        let (svc, images) = setup();
        let owner = Uuid::new_v4();
        let listing = svc.create(owner, input("design")).await.unwrap();

        let err = svc.delete(Uuid::new_v4(), Role::Freelancer, listing.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(images.destroyed().is_empty());

        svc.delete(Uuid::new_v4(), Role::Admin, listing.id).await.unwrap();
        assert_eq!(images.destroyed(), vec!["services/img1".to_string()]);
        assert!(matches!(svc.get(listing.id).await, Err(ServiceError::NotFound(_))));
    }
}
