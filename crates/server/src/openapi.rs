use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct ErrorBody { pub error: String }

#[derive(ToSchema)]
pub struct MessageDoc { pub message: String }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct RegisterRequest { pub username: String, pub email: String, pub password: String, pub confirmPassword: String }

#[derive(ToSchema)]
pub struct VerifyRequest { pub code: String }

/// Either `username` or `email` identifies the account.
#[derive(ToSchema)]
pub struct LoginRequest { pub username: Option<String>, pub email: Option<String>, pub password: String }

#[derive(ToSchema)]
pub struct ForgotPasswordRequest { pub email: String }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct ResetPasswordRequest { pub newPassword: String, pub confirmPassword: String }

#[derive(ToSchema)]
pub struct UserDoc {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// `client`, `freelancer` or `admin`.
    pub role: String,
    pub account_verification: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(ToSchema)]
pub struct UserMessageDoc { pub message: String, pub user: UserDoc }

#[derive(ToSchema)]
pub struct UserOutputDoc { pub user: UserDoc }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct RefreshResponse { pub message: String, pub accessToken: String }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct UserPageDoc { pub users: Vec<UserDoc>, pub totalUsers: u64 }

#[derive(ToSchema)]
pub struct RoleRequest { pub role: String }

#[derive(ToSchema)]
pub struct ListingDoc {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub images: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// `images` entries are URLs or data URIs handed to the image host.
#[derive(ToSchema)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub images: Vec<String>,
}

#[derive(ToSchema)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(ToSchema)]
pub struct ListingMessageDoc { pub message: String, pub service: ListingDoc }

#[derive(ToSchema)]
pub struct ListingOutputDoc { pub service: ListingDoc }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct ListingPageDoc { pub services: Vec<ListingDoc>, pub totalServices: u64, pub page: u64, pub limit: u64 }

/// Only `service_id` is used for pricing; price, payee and title come from the stored listing.
#[derive(ToSchema)]
pub struct CheckoutRequestDoc {
    pub service_id: Uuid,
    pub freelancer_id: Option<Uuid>,
    pub service_title: Option<String>,
    pub service_price: Option<f64>,
    /// Used only when the listing has no image
    pub service_image: Option<String>,
}

#[derive(ToSchema)]
pub struct CheckoutUrlDoc { pub url: String }

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct CheckoutSuccessRequest { pub sessionId: String }

#[derive(ToSchema)]
pub struct OrderDoc {
    pub id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub service_id: Uuid,
    pub amount: f64,
    pub status: String,
    pub stripe_session_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(ToSchema)]
pub struct OrderMessageDoc { pub message: String, pub order: OrderDoc }

#[derive(ToSchema)]
pub struct OrderSummaryDoc {
    pub id: Uuid,
    pub amount: f64,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub service_title: String,
    pub service_description: String,
    pub service_price: f64,
    pub service_images: Vec<String>,
}

#[derive(ToSchema)]
pub struct OrderListDoc { pub orders: Vec<OrderSummaryDoc> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::verify,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::forgot_password,
        crate::routes::auth::reset_password,
        crate::routes::auth::refresh_token,
        crate::routes::auth::check_auth,
        crate::routes::users::list,
        crate::routes::users::get_one,
        crate::routes::users::set_role,
        crate::routes::users::delete_one,
        crate::routes::listings::list,
        crate::routes::listings::create,
        crate::routes::listings::get_one,
        crate::routes::listings::update,
        crate::routes::listings::delete_one,
        crate::routes::payments::create_checkout_session,
        crate::routes::payments::checkout_success,
        crate::routes::orders::my_orders,
        crate::routes::orders::freelancer_orders,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            MessageDoc,
            RegisterRequest,
            VerifyRequest,
            LoginRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UserDoc,
            UserMessageDoc,
            UserOutputDoc,
            RefreshResponse,
            UserPageDoc,
            RoleRequest,
            ListingDoc,
            CreateListingRequest,
            UpdateListingRequest,
            ListingMessageDoc,
            ListingOutputDoc,
            ListingPageDoc,
            CheckoutRequestDoc,
            CheckoutUrlDoc,
            CheckoutSuccessRequest,
            OrderDoc,
            OrderMessageDoc,
            OrderSummaryDoc,
            OrderListDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "users"),
        (name = "services"),
        (name = "payments"),
        (name = "orders")
    )
)]
pub struct ApiDoc;
