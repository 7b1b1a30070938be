use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::auth::AuthError;
use service::errors::ServiceError;
use tracing::error;

pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error response rendered as `{"error": message}`.
///
/// `detail` carries the underlying cause of 5xx errors for the log; clients only see `message`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, message: message.into(), detail }
    }

    pub fn bad_request(message: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, message, None) }
    pub fn unauthorized(message: impl Into<String>) -> Self { Self::new(StatusCode::UNAUTHORIZED, message, None) }
    pub fn forbidden(message: impl Into<String>) -> Self { Self::new(StatusCode::FORBIDDEN, message, None) }
    pub fn not_found(message: impl Into<String>) -> Self { Self::new(StatusCode::NOT_FOUND, message, None) }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE, Some(detail.into()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = self.detail.as_deref().unwrap_or(""), "request failed");
        }
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::Validation(_)
            | AuthError::Conflict(_)
            | AuthError::InvalidCredentials(_)
            | AuthError::InvalidOrExpired(_) => Self::bad_request(message),
            AuthError::Unauthorized(_) => Self::unauthorized(message),
            AuthError::Forbidden(_) => Self::forbidden(message),
            AuthError::NotFound(_) => Self::not_found(message),
            AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Repository(_) | AuthError::Session(_) => {
                Self::internal(format!("auth error {}: {}", e.code(), message))
            }
        }
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let message = e.to_string();
        match e {
            ServiceError::Validation(_) | ServiceError::Conflict(_) => Self::bad_request(message),
            ServiceError::NotFound(_) => Self::not_found(message),
            ServiceError::Forbidden(_) => Self::forbidden(message),
            ServiceError::Db(_) | ServiceError::Upstream(_) => Self::internal(message),
        }
    }
}

// Malformed bodies, path segments and query strings are client errors.
impl From<JsonRejection> for JsonApiError {
    fn from(r: JsonRejection) -> Self { JsonApiError::bad_request(r.body_text()) }
}

impl From<PathRejection> for JsonApiError {
    fn from(r: PathRejection) -> Self { JsonApiError::bad_request(r.body_text()) }
}

impl From<QueryRejection> for JsonApiError {
    fn from(r: QueryRejection) -> Self { JsonApiError::bad_request(r.body_text()) }
}
