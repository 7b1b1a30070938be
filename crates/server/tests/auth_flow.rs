use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use models::user::Role;
use serde_json::{json, Value};
use tower::Service;

use server::cookies::CookiePolicy;
use server::routes;
use server::state::ServerState;
use service::auth::repository::mock::MockAuthRepository;
use service::auth::session::mock::InMemorySessionStore;
use service::auth::tokens::TokenIssuer;
use service::auth::{AuthService, AuthSettings};
use service::listings::mock::MockListingRepository;
use service::listings::ListingService;
use service::mail::mock::RecordingMailer;
use service::mail::MailDispatcher;
use service::media::mock::RecordingImageHost;
use service::orders::mock::MockOrderRepository;
use service::orders::OrderService;
use service::payments::mock::MockGateway;
use service::payments::CheckoutService;
use service::users::mock::MockUserRepository;
use service::users::UserService;

struct Harness {
    app: Router,
    state: ServerState,
    repo: Arc<MockAuthRepository>,
    sessions: Arc<InMemorySessionStore>,
    mailer: Arc<RecordingMailer>,
    gateway: Arc<MockGateway>,
    orders: Arc<MockOrderRepository>,
}

fn harness() -> Harness {
    let repo = Arc::new(MockAuthRepository::default());
    let sessions = Arc::new(InMemorySessionStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let gateway = Arc::new(MockGateway::default());
    let orders = Arc::new(MockOrderRepository::default());
    let listing_repo = Arc::new(MockListingRepository::default());

    let tokens = TokenIssuer::new("test-access", "test-refresh", chrono::Duration::minutes(15), chrono::Duration::days(7));
    let auth = AuthService::new(repo.clone(), sessions.clone(), tokens, MailDispatcher::new(mailer.clone()), AuthSettings::default());
    let state = ServerState {
        auth: Arc::new(auth),
        users: Arc::new(UserService::new(Arc::new(MockUserRepository::default()))),
        listings: Arc::new(ListingService::new(listing_repo.clone(), Arc::new(RecordingImageHost::default()), "services")),
        checkout: Arc::new(CheckoutService::new(gateway.clone(), orders.clone(), listing_repo, "http://localhost:5173", "usd")),
        orders: Arc::new(OrderService::new(orders.clone())),
        cookies: CookiePolicy::default(),
    };
    let app = routes::build_router(state.clone(), tower_http::cors::CorsLayer::very_permissive());
    Harness { app, state, repo, sessions, mailer, gateway, orders }
}

struct Reply {
    status: StatusCode,
    cookies: Vec<String>,
    body: Value,
}

impl Reply {
    /// `name=value` pairs from Set-Cookie, attributes stripped.
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies
            .iter()
            .filter_map(|c| c.split(';').next())
            .find(|pair| pair.starts_with(&format!("{}=", name)))
            .map(str::to_string)
    }

    fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
    match body {
        Some(v) => send_raw(app, method, uri, cookie, Some("application/json"), serde_json::to_vec(&v).unwrap()).await,
        None => send_raw(app, method, uri, cookie, None, Vec::new()).await,
    }
}

async fn send_raw(app: &Router, method: &str, uri: &str, cookie: Option<&str>, content_type: Option<&str>, body: Vec<u8>) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        req = req.header("cookie", c);
    }
    if let Some(ct) = content_type {
        req = req.header("content-type", ct);
    }
    let req = req.body(Body::from(body)).unwrap();
    let resp = app.clone().call(req).await.unwrap();
    let status = resp.status();
    let cookies = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    Reply { status, cookies, body }
}

async fn register(h: &Harness, username: &str, email: &str) -> Reply {
    send(
        &h.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": username, "email": email, "password": "abc123", "confirmPassword": "abc123"})),
    )
    .await
}

/// Register, verify and log in; returns the Cookie header for later requests.
async fn signed_in(h: &Harness, username: &str, email: &str) -> String {
    assert_eq!(register(h, username, email).await.status, StatusCode::CREATED);
    let code = h.repo.verification_code_for(email).unwrap();
    assert_eq!(send(&h.app, "POST", "/api/auth/verify", None, Some(json!({"code": code}))).await.status, StatusCode::OK);
    let login = send(&h.app, "POST", "/api/auth/login", None, Some(json!({"email": email, "password": "abc123"}))).await;
    assert_eq!(login.status, StatusCode::OK);
    format!("{}; {}", login.cookie("accessToken").unwrap(), login.cookie("refreshToken").unwrap())
}

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let r = send(&h.app, "GET", "/health", None, None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["status"], "ok");
}

#[tokio::test]
async fn register_verify_login_check_auth() {
    let h = harness();

    let r = register(&h, "alice", "Alice@X.com").await;
    assert_eq!(r.status, StatusCode::CREATED);
    assert_eq!(r.body["message"], "User registered successfully");
    assert_eq!(r.body["user"]["email"], "alice@x.com");
    assert_eq!(r.body["user"]["account_verification"], false);
    assert!(r.body["user"].get("password_hash").is_none());

    let mails = h.mailer.wait_for(1).await;
    assert_eq!(mails[0].subject, "Account Verification");

    let r = send(&h.app, "POST", "/api/auth/login", None, Some(json!({"username": "alice", "password": "abc123"}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Account not verified. Please check your email for the verification code.");

    let code = h.repo.verification_code_for("alice@x.com").unwrap();
    let r = send(&h.app, "POST", "/api/auth/verify", None, Some(json!({"code": code}))).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["user"]["account_verification"], true);

    let r = send(&h.app, "POST", "/api/auth/verify", None, Some(json!({"code": code}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Invalid or expired verification code");

    let r = send(&h.app, "POST", "/api/auth/login", None, Some(json!({"username": "alice", "password": "abc123"}))).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["message"], "Login successful");
    let access = r.cookie("accessToken").unwrap();
    assert!(r.cookie("refreshToken").is_some());
    assert!(r.cookies.iter().all(|c| c.contains("HttpOnly") && c.contains("SameSite=Strict")));

    let r = send(&h.app, "GET", "/api/auth/check-auth", Some(&access), None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["user"]["username"], "alice");
}

#[tokio::test]
async fn check_auth_rejects_missing_and_garbage_tokens() {
    let h = harness();
    let r = send(&h.app, "GET", "/api/auth/check-auth", None, None).await;
    assert_eq!(r.status, StatusCode::UNAUTHORIZED);
    assert_eq!(r.error(), "Unauthorized - No token provided");

    let r = send(&h.app, "GET", "/api/auth/check-auth", Some("accessToken=not-a-jwt"), None).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
    assert_eq!(r.error(), "Forbidden - Invalid token");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_distinct() {
    let h = harness();
    signed_in(&h, "bob", "bob@x.com").await;

    let r = send(&h.app, "POST", "/api/auth/login", None, Some(json!({"email": "bob@x.com", "password": "zzz999"}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Invalid password");

    let r = send(&h.app, "POST", "/api/auth/login", None, Some(json!({"email": "nobody@x.com", "password": "abc123"}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Invalid username or email");
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let h = harness();
    assert_eq!(register(&h, "carol", "carol@x.com").await.status, StatusCode::CREATED);

    let r = register(&h, "carol2", "carol@x.com").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Email already exists");

    let r = register(&h, "carol", "other@x.com").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Username already exists");
}

#[tokio::test]
async fn register_reports_first_invalid_field() {
    let h = harness();
    let r = send(
        &h.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "ab", "email": "bad", "password": "abc123", "confirmPassword": "abc123"})),
    )
    .await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Username must be between 3 and 15 characters");
}

#[tokio::test]
async fn refresh_then_logout_invalidates_session() {
    let h = harness();
    let cookies = signed_in(&h, "dave", "dave@x.com").await;
    let refresh_only = cookies.split("; ").find(|c| c.starts_with("refreshToken=")).unwrap().to_string();

    let r = send(&h.app, "POST", "/api/auth/refresh-token", None, None).await;
    assert_eq!(r.status, StatusCode::UNAUTHORIZED);
    assert_eq!(r.error(), "No refresh token provided");

    let r = send(&h.app, "POST", "/api/auth/refresh-token", Some(&refresh_only), None).await;
    assert_eq!(r.status, StatusCode::OK);
    let fresh = r.body["accessToken"].as_str().unwrap().to_string();
    assert_eq!(r.cookie("accessToken").unwrap(), format!("accessToken={}", fresh));

    let me = send(&h.app, "GET", "/api/auth/check-auth", Some(&cookies), None).await;
    let user_id: uuid::Uuid = me.body["user"]["id"].as_str().unwrap().parse().unwrap();
    assert!(h.sessions.contains(user_id));

    let r = send(&h.app, "POST", "/api/auth/logout", Some(&cookies), None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["message"], "Logout successful");
    assert_eq!(r.cookie("accessToken").as_deref(), Some("accessToken="));
    assert_eq!(r.cookie("refreshToken").as_deref(), Some("refreshToken="));
    assert!(!h.sessions.contains(user_id));

    let r = send(&h.app, "POST", "/api/auth/refresh-token", Some(&refresh_only), None).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
    assert_eq!(r.error(), "Refresh token does not match");
}

#[tokio::test]
async fn logout_without_cookies_still_succeeds() {
    let h = harness();
    let r = send(&h.app, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(r.status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_is_single_use() {
    let h = harness();
    signed_in(&h, "erin", "erin@x.com").await;

    let r = send(&h.app, "POST", "/api/auth/forgot-password", None, Some(json!({"email": "missing@x.com"}))).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert_eq!(r.error(), "Email not found");

    let r = send(&h.app, "POST", "/api/auth/forgot-password", None, Some(json!({"email": "erin@x.com"}))).await;
    assert_eq!(r.status, StatusCode::OK);
    let token = h.repo.reset_token_for("erin@x.com").unwrap();
    let mails = h.mailer.wait_for(3).await;
    assert!(mails.iter().any(|m| m.subject == "Password Reset Request" && m.html.contains(&token)));

    let uri = format!("/api/auth/reset-password/{}", token);
    let r = send(&h.app, "POST", &uri, None, Some(json!({"newPassword": "xyz789", "confirmPassword": "xyz000"}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Passwords do not match");

    let r = send(&h.app, "POST", &uri, None, Some(json!({"newPassword": "xyz789", "confirmPassword": "xyz789"}))).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["message"], "Password reset successfully");

    let r = send(&h.app, "POST", &uri, None, Some(json!({"newPassword": "xyz789", "confirmPassword": "xyz789"}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Invalid or expired reset token");

    let r = send(&h.app, "POST", "/api/auth/login", None, Some(json!({"email": "erin@x.com", "password": "xyz789"}))).await;
    assert_eq!(r.status, StatusCode::OK);
}

#[tokio::test]
async fn role_guards_protect_admin_and_listing_routes() {
    let h = harness();
    let client = signed_in(&h, "frank", "frank@x.com").await;

    let r = send(&h.app, "GET", "/api/users", Some(&client), None).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
    assert_eq!(r.error(), "Access denied. Admins only.");

    let r = send(&h.app, "GET", "/api/services", Some(&client), None).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);

    h.repo.set_role("frank@x.com", Role::Admin);
    let r = send(&h.app, "GET", "/api/users", Some(&client), None).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert_eq!(r.error(), "No users found");
}

#[tokio::test]
async fn listing_checkout_and_orders() {
    let h = harness();
    let seller = signed_in(&h, "gina", "gina@x.com").await;
    let buyer = signed_in(&h, "hank", "hank@x.com").await;
    h.repo.set_role("gina@x.com", Role::Freelancer);

    let r = send(&h.app, "POST", "/api/services", Some(&seller), Some(json!({"title": "Logo"}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "All fields are required");

    let r = send(
        &h.app,
        "POST",
        "/api/services",
        Some(&seller),
        Some(json!({"title": "Logo", "description": "A logo", "price": 49.5, "category": "design", "images": ["data:image/png;base64,AAAA"]})),
    )
    .await;
    assert_eq!(r.status, StatusCode::CREATED);
    let listing_id = r.body["service"]["id"].as_str().unwrap().to_string();
    let freelancer_id = r.body["service"]["user_id"].as_str().unwrap().to_string();
    let image = r.body["service"]["images"][0].as_str().unwrap().to_string();

    let r = send(&h.app, "GET", "/api/services?category=design", Some(&seller), None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["totalServices"], 1);

    let r = send(&h.app, "PATCH", &format!("/api/services/{}", listing_id), Some(&buyer), Some(json!({"title": "Mine"}))).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
    assert_eq!(r.error(), "You are not authorized to update this service");

    // the storefront's price and payee are ignored in favour of the stored listing
    let checkout = json!({
        "freelancer_id": uuid::Uuid::new_v4().to_string(),
        "service_id": listing_id,
        "service_title": "Logo",
        "service_price": 0.01,
        "service_image": image,
    });
    let r = send(&h.app, "POST", "/api/payments/create-checkout-session", Some(&buyer), Some(checkout)).await;
    assert_eq!(r.status, StatusCode::OK);
    assert!(r.body["url"].as_str().unwrap().starts_with("https://checkout.test/"));
    let req = &h.gateway.requests()[0];
    assert_eq!(req.unit_amount_cents, 4950);
    assert!(req.metadata.contains(&("freelancer_id".to_string(), freelancer_id.clone())));

    let r = send(
        &h.app,
        "POST",
        "/api/payments/create-checkout-session",
        Some(&buyer),
        Some(json!({"service_id": uuid::Uuid::new_v4().to_string()})),
    )
    .await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert_eq!(r.error(), "Service not found");

    let session_id = h.gateway.last_session_id().unwrap();
    let r = send(&h.app, "POST", "/api/payments/checkout-success", Some(&buyer), Some(json!({"sessionId": session_id}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.error(), "Payment not completed");

    h.gateway.mark_paid(&session_id);
    let first = send(&h.app, "POST", "/api/payments/checkout-success", Some(&buyer), Some(json!({"sessionId": session_id}))).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let replay = send(&h.app, "POST", "/api/payments/checkout-success", Some(&buyer), Some(json!({"sessionId": session_id}))).await;
    assert_eq!(replay.body["order"]["id"], first.body["order"]["id"]);
    assert_eq!(h.orders.len(), 1);

    let other = signed_in(&h, "ivy", "ivy@x.com").await;
    let r = send(&h.app, "POST", "/api/payments/checkout-success", Some(&other), Some(json!({"sessionId": session_id}))).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
    assert!(r.body["order"].is_null());
    assert_eq!(h.orders.len(), 1);

    let listing = h.state.listings.get(listing_id.parse().unwrap()).await.unwrap();
    h.orders.add_listing(listing);

    let r = send(&h.app, "GET", "/api/orders", Some(&buyer), None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["orders"][0]["service_title"], "Logo");

    let r = send(&h.app, "GET", "/api/orders/freelancer-orders", Some(&seller), None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["orders"].as_array().unwrap().len(), 1);

    let r = send(&h.app, "GET", "/api/orders/freelancer-orders", Some(&buyer), None).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert_eq!(r.error(), "No orders found");

    let r = send(&h.app, "DELETE", &format!("/api/services/{}", listing_id), Some(&seller), None).await;
    assert_eq!(r.status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_input_gets_json_400() {
    let h = harness();

    let r = send_raw(&h.app, "POST", "/api/auth/register", None, Some("application/json"), b"{not json".to_vec()).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert!(!r.error().is_empty());

    let r = send_raw(&h.app, "POST", "/api/auth/login", None, None, br#"{"email":"a@x.com","password":"abc123"}"#.to_vec()).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert!(!r.error().is_empty());

    let r = send(&h.app, "POST", "/api/auth/register", None, Some(json!({"username": 5, "email": "a@x.com"}))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert!(!r.error().is_empty());

    let cookie = signed_in(&h, "jill", "jill@x.com").await;
    let r = send(&h.app, "GET", "/api/services/not-a-uuid", Some(&cookie), None).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert!(!r.error().is_empty());
}
