use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use common::types::Message;
use serde::Serialize;
use service::auth::domain::{AuthUser, ForgotPasswordInput, LoginInput, RegisterInput, ResetPasswordInput, VerifyInput};

use crate::cookies::REFRESH_COOKIE;
use crate::errors::JsonApiError;
use crate::extract::{CurrentUser, Json, Path};
use crate::state::ServerState;

#[derive(Debug, Serialize)]
pub struct UserMessage {
    pub message: &'static str,
    pub user: AuthUser,
}

#[derive(Debug, Serialize)]
pub struct UserOutput {
    pub user: AuthUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutput {
    pub message: &'static str,
    pub access_token: String,
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify", post(verify))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
        .route("/refresh-token", post(refresh_token))
        .route("/check-auth", get(check_auth))
}

fn refresh_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE).map(|c| c.value().to_string())
}

#[utoipa::path(post, path = "/api/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered, verification code mailed", body = crate::openapi::UserMessageDoc), (status = 400, description = "Invalid input or duplicate username/email", body = crate::openapi::ErrorBody)))]
pub async fn register(State(state): State<ServerState>, Json(input): Json<RegisterInput>) -> Result<(StatusCode, Json<UserMessage>), JsonApiError> {
    let user = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(UserMessage { message: "User registered successfully", user })))
}

#[utoipa::path(post, path = "/api/auth/verify", tag = "auth", request_body = crate::openapi::VerifyRequest, responses((status = 200, description = "Account verified", body = crate::openapi::UserMessageDoc), (status = 400, description = "Invalid or expired code", body = crate::openapi::ErrorBody)))]
pub async fn verify(State(state): State<ServerState>, Json(input): Json<VerifyInput>) -> Result<Json<UserMessage>, JsonApiError> {
    let user = state.auth.verify_account(&input.code).await?;
    Ok(Json(UserMessage { message: "Account verified successfully", user }))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged in; sets accessToken and refreshToken cookies", body = crate::openapi::UserMessageDoc), (status = 400, description = "Invalid credentials or unverified account", body = crate::openapi::ErrorBody)))]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, Json(input): Json<LoginInput>) -> Result<(CookieJar, Json<UserMessage>), JsonApiError> {
    let session = state.auth.login(input).await?;
    let jar = jar
        .add(state.cookies.access(session.access_token))
        .add(state.cookies.refresh(session.refresh_token));
    Ok((jar, Json(UserMessage { message: "Login successful", user: session.user })))
}

#[utoipa::path(post, path = "/api/auth/logout", tag = "auth", responses((status = 200, description = "Logged out; session cookies cleared", body = crate::openapi::MessageDoc)))]
pub async fn logout(State(state): State<ServerState>, jar: CookieJar) -> Result<(CookieJar, Json<Message>), JsonApiError> {
    state.auth.logout(refresh_cookie(&jar).as_deref()).await?;
    Ok((state.cookies.clear(jar), Json(Message::new("Logout successful"))))
}

#[utoipa::path(post, path = "/api/auth/forgot-password", tag = "auth", request_body = crate::openapi::ForgotPasswordRequest, responses((status = 200, description = "Reset link mailed", body = crate::openapi::MessageDoc), (status = 404, description = "Email not found", body = crate::openapi::ErrorBody)))]
pub async fn forgot_password(State(state): State<ServerState>, Json(input): Json<ForgotPasswordInput>) -> Result<Json<Message>, JsonApiError> {
    state.auth.forgot_password(&input.email).await?;
    Ok(Json(Message::new("Password reset link sent to your email")))
}

#[utoipa::path(post, path = "/api/auth/reset-password/{token}", tag = "auth", params(("token" = String, Path, description = "Reset token from the emailed link")), request_body = crate::openapi::ResetPasswordRequest, responses((status = 200, description = "Password replaced", body = crate::openapi::UserMessageDoc), (status = 400, description = "Invalid or expired token, or invalid password", body = crate::openapi::ErrorBody)))]
pub async fn reset_password(State(state): State<ServerState>, Path(token): Path<String>, Json(input): Json<ResetPasswordInput>) -> Result<Json<UserMessage>, JsonApiError> {
    let user = state.auth.reset_password(&token, input).await?;
    Ok(Json(UserMessage { message: "Password reset successfully", user }))
}

#[utoipa::path(post, path = "/api/auth/refresh-token", tag = "auth", responses((status = 200, description = "New access token; sets accessToken cookie", body = crate::openapi::RefreshResponse), (status = 401, description = "No refresh token", body = crate::openapi::ErrorBody), (status = 403, description = "Invalid or stale refresh token", body = crate::openapi::ErrorBody)))]
pub async fn refresh_token(State(state): State<ServerState>, jar: CookieJar) -> Result<(CookieJar, Json<RefreshOutput>), JsonApiError> {
    let access = state.auth.refresh(refresh_cookie(&jar).as_deref()).await?;
    let jar = jar.add(state.cookies.access(access.clone()));
    Ok((jar, Json(RefreshOutput { message: "Token refreshed successfully", access_token: access })))
}

#[utoipa::path(get, path = "/api/auth/check-auth", tag = "auth", responses((status = 200, description = "Current user", body = crate::openapi::UserOutputDoc), (status = 401, description = "No access token", body = crate::openapi::ErrorBody), (status = 403, description = "Invalid access token", body = crate::openapi::ErrorBody)))]
pub async fn check_auth(CurrentUser(user): CurrentUser) -> Json<UserOutput> {
    Json(UserOutput { user })
}
