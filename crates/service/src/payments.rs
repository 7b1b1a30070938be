//! Checkout sessions and the orders they produce.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use configs::StripeConfig;
use models::order::NewOrder;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::listings::ListingRepository;
use crate::orders::{Order, OrderRepository};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway not configured")]
    NotConfigured,
    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment gateway rejected request: {0}")]
    Rejected(String),
}

impl From<PaymentError> for ServiceError {
    fn from(e: PaymentError) -> Self { ServiceError::Upstream(e.to_string()) }
}

/// One-item card checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub product_name: String,
    pub product_image: Option<String>,
    pub unit_amount_cents: i64,
    pub currency: String,
    pub metadata: Vec<(String, String)>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool { self.payment_status == "paid" }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, PaymentError>;
    /// `None` when the gateway does not know `id`.
    async fn retrieve_checkout_session(&self, id: &str) -> Result<Option<CheckoutSession>, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Stripe Checkout over its form-encoded REST API.
pub struct StripeGateway {
    http: reqwest::Client,
    cfg: StripeConfig,
}

impl StripeGateway {
    pub fn new(cfg: StripeConfig) -> Self {
        Self { http: reqwest::Client::new(), cfg }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.api_base.trim_end_matches('/'), path)
    }

    async fn rejected(resp: reqwest::Response) -> PaymentError {
        let status = resp.status();
        match resp.json::<StripeErrorBody>().await {
            Ok(body) => PaymentError::Rejected(body.error.message.unwrap_or_else(|| status.to_string())),
            Err(_) => PaymentError::Rejected(status.to_string()),
        }
    }
}

/// Flatten a checkout request into Stripe's bracketed form keys.
pub fn checkout_form(req: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("mode".into(), "payment".into()),
        ("line_items[0][price_data][currency]".into(), req.currency.clone()),
        ("line_items[0][price_data][product_data][name]".into(), req.product_name.clone()),
        ("line_items[0][price_data][unit_amount]".into(), req.unit_amount_cents.to_string()),
        ("line_items[0][quantity]".into(), "1".into()),
        ("success_url".into(), req.success_url.clone()),
        ("cancel_url".into(), req.cancel_url.clone()),
    ];
    if let Some(image) = &req.product_image {
        form.push(("line_items[0][price_data][product_data][images][0]".into(), image.clone()));
    }
    for (k, v) in &req.metadata {
        form.push((format!("metadata[{}]", k), v.clone()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let resp = self
            .http
            .post(self.url("checkout/sessions"))
            .bearer_auth(&self.cfg.secret_key)
            .form(&checkout_form(req))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::rejected(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<Option<CheckoutSession>, PaymentError> {
        let resp = self
            .http
            .get(self.url(&format!("checkout/sessions/{}", id)))
            .bearer_auth(&self.cfg.secret_key)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::rejected(resp).await);
        }
        Ok(Some(resp.json().await?))
    }
}

/// Used when no gateway is configured.
#[derive(Debug, Default)]
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_checkout_session(&self, _req: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn retrieve_checkout_session(&self, _id: &str) -> Result<Option<CheckoutSession>, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}

/// Checkout body as the storefront sends it.
///
/// Only `service_id` is trusted. Price, payee and title are read from the
/// stored listing; `service_image` is a fallback when the listing has none.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutInput {
    pub freelancer_id: Option<String>,
    pub service_id: Option<String>,
    pub service_title: Option<String>,
    pub service_price: Option<Decimal>,
    pub service_image: Option<String>,
}

pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderRepository>,
    listings: Arc<dyn ListingRepository>,
    client_url: String,
    currency: String,
}

fn forbidden_order() -> ServiceError {
    ServiceError::Forbidden("This checkout session belongs to another user".into())
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, ServiceError> {
    Uuid::from_str(raw.trim()).map_err(|_| ServiceError::Validation(format!("Invalid {}", what)))
}

impl CheckoutService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderRepository>,
        listings: Arc<dyn ListingRepository>,
        client_url: &str,
        currency: &str,
    ) -> Self {
        Self {
            gateway,
            orders,
            listings,
            client_url: client_url.trim_end_matches('/').to_string(),
            currency: currency.to_string(),
        }
    }

    /// Open a gateway checkout for one listing on behalf of `client_id`; returns the redirect URL.
    #[instrument(skip(self, input))]
    pub async fn create_checkout_session(&self, client_id: Uuid, input: CheckoutInput) -> Result<String, ServiceError> {
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let raw_id = text(input.service_id).ok_or_else(|| ServiceError::Validation("Missing required fields".into()))?;
        let service_id = parse_id(&raw_id, "service_id")?;
        let listing = self
            .listings
            .find(service_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Service"))?;

        let price = listing.price;
        if price <= Decimal::ZERO {
            return Err(ServiceError::Validation("Invalid service_price".into()));
        }
        let cents = (price * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| ServiceError::Validation("Invalid service_price".into()))?;
        let image = listing.images.first().cloned().or_else(|| text(input.service_image));

        let req = CheckoutRequest {
            product_name: listing.title.clone(),
            product_image: image,
            unit_amount_cents: cents,
            currency: self.currency.clone(),
            metadata: vec![
                ("service_id".into(), listing.id.to_string()),
                ("freelancer_id".into(), listing.user_id.to_string()),
                ("client_id".into(), client_id.to_string()),
                ("amount".into(), price.to_string()),
            ],
            success_url: format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.client_url),
            cancel_url: format!("{}/checkout-cancel", self.client_url),
        };
        let session = self.gateway.create_checkout_session(&req).await?;
        info!(session_id = %session.id, %service_id, "checkout_session_created");
        session.url.ok_or_else(|| ServiceError::Upstream("checkout session has no url".into()))
    }

    /// Record the order for a paid session. Replaying a session returns the recorded order.
    #[instrument(skip(self))]
    pub async fn complete_checkout(&self, client_id: Uuid, session_id: &str) -> Result<Order, ServiceError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ServiceError::Validation("Session ID is required".into()));
        }
        if let Some(existing) = self.orders.find_by_session(session_id).await? {
            if existing.client_id != client_id {
                return Err(forbidden_order());
            }
            return Ok(existing);
        }

        let session = self
            .gateway
            .retrieve_checkout_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Session not found".into()))?;
        if !session.is_paid() {
            return Err(ServiceError::Validation("Payment not completed".into()));
        }

        let meta = |key: &str| {
            session
                .metadata
                .get(key)
                .cloned()
                .ok_or_else(|| ServiceError::Upstream(format!("checkout session missing metadata {}", key)))
        };
        let malformed = |key: &str| ServiceError::Upstream(format!("checkout session has malformed {}", key));
        let buyer = Uuid::from_str(&meta("client_id")?).map_err(|_| malformed("client_id"))?;
        if buyer != client_id {
            return Err(forbidden_order());
        }
        let freelancer_id = Uuid::from_str(&meta("freelancer_id")?).map_err(|_| malformed("freelancer_id"))?;
        let service_id = Uuid::from_str(&meta("service_id")?).map_err(|_| malformed("service_id"))?;
        let amount = Decimal::from_str(&meta("amount")?).map_err(|_| malformed("amount"))?;

        let new_order = NewOrder {
            client_id,
            freelancer_id,
            service_id,
            amount,
            stripe_session_id: session.id.clone(),
        };
        match self.orders.create(new_order).await {
            Ok(order) => {
                info!(order_id = %order.id, %client_id, "order_recorded");
                Ok(order)
            }
            // lost a race with a concurrent replay of the same session
            Err(ServiceError::Conflict(_)) => match self.orders.find_by_session(&session.id).await? {
                Some(order) if order.client_id == client_id => Ok(order),
                Some(_) => Err(forbidden_order()),
                None => Err(ServiceError::Db("order vanished after conflict".into())),
            },
            Err(e) => Err(e),
        }
    }
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Sessions live in memory; tests flip them to paid.
    #[derive(Default)]
    pub struct MockGateway {
        sessions: Mutex<HashMap<String, CheckoutSession>>,
        requests: Mutex<Vec<CheckoutRequest>>,
    }

    impl MockGateway {
        pub fn mark_paid(&self, id: &str) {
            if let Some(s) = self.sessions.lock().unwrap().get_mut(id) {
                s.payment_status = "paid".into();
            }
        }

        pub fn requests(&self) -> Vec<CheckoutRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn last_session_id(&self) -> Option<String> {
            let n = self.requests.lock().unwrap().len();
            (n > 0).then(|| format!("cs_test_{}", n))
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(req.clone());
            let id = format!("cs_test_{}", requests.len());
            let session = CheckoutSession {
                id: id.clone(),
                url: Some(format!("https://checkout.test/pay/{}", id)),
                payment_status: "unpaid".into(),
                metadata: req.metadata.iter().cloned().collect(),
            };
            self.sessions.lock().unwrap().insert(id, session.clone());
            Ok(session)
        }

        async fn retrieve_checkout_session(&self, id: &str) -> Result<Option<CheckoutSession>, PaymentError> {
            Ok(self.sessions.lock().unwrap().get(id).cloned())
        }
    }
}
