//! Request extractors: cookie authentication plus JSON, path and query
//! extractors whose rejections render as the usual `{"error"}` body.

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use models::user::Role;
use serde::Serialize;
use service::auth::domain::AuthUser;
use tracing::debug;

use crate::cookies::ACCESS_COOKIE;
use crate::errors::JsonApiError;
use crate::state::ServerState;

/// JSON body extractor and response.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(JsonApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(JsonApiError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(JsonApiError))]
pub struct Query<T>(pub T);

/// The user behind the `accessToken` cookie.
///
/// Missing cookie is 401, a bad or expired token 403, a deleted user 404.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| JsonApiError::unauthorized("Unauthorized - No token provided"))?;

        let user_id = state.auth.authenticate(&token).map_err(|e| {
            debug!(error = %e, "access token rejected");
            JsonApiError::forbidden("Forbidden - Invalid token")
        })?;

        let user = state.auth.current_user(user_id).await?;
        Ok(CurrentUser(user))
    }
}

impl CurrentUser {
    /// 403 with `message` unless the user holds one of `roles`.
    pub fn require(&self, roles: &[Role], message: &str) -> Result<(), JsonApiError> {
        if roles.contains(&self.0.role) {
            return Ok(());
        }
        Err(JsonApiError::forbidden(message))
    }

    pub fn require_admin(&self) -> Result<(), JsonApiError> {
        self.require(&[Role::Admin], "Access denied. Admins only.")
    }

    pub fn require_client(&self) -> Result<(), JsonApiError> {
        self.require(&[Role::Client], "Access denied. Clients only.")
    }

    pub fn require_freelancer(&self) -> Result<(), JsonApiError> {
        self.require(&[Role::Freelancer], "Access denied. Freelancers only.")
    }

    pub fn require_admin_or_freelancer(&self) -> Result<(), JsonApiError> {
        self.require(&[Role::Admin, Role::Freelancer], "Access denied. Admins or Freelancers only.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser(AuthUser {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            role,
            account_verification: true,
            created_at: chrono::Utc::now(),
        })
    }

    #[test]
    fn role_guards() {
        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(user(Role::Client).require_client().is_ok());
        assert!(user(Role::Admin).require_client().is_err());
        assert!(user(Role::Client).require_admin().is_err());
        assert!(user(Role::Freelancer).require_admin_or_freelancer().is_ok());
        assert!(user(Role::Client).require_admin_or_freelancer().is_err());
        assert_eq!(user(Role::Client).require_freelancer().unwrap_err().status, axum::http::StatusCode::FORBIDDEN);
    }
}
