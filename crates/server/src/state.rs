use std::sync::Arc;

use service::auth::AuthService;
use service::listings::ListingService;
use service::orders::OrderService;
use service::payments::CheckoutService;
use service::users::UserService;

use crate::cookies::CookiePolicy;

/// Shared handler state; every collaborator is injected at startup.
#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub listings: Arc<ListingService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub cookies: CookiePolicy,
}
