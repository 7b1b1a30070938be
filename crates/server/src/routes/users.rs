use axum::extract::State;
use axum::routing::get;
use axum::Router;
use common::types::Message;
use serde::Deserialize;
use service::pagination::Pagination;
use service::users::UserPage;
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::routes::auth::{UserMessage, UserOutput};
use crate::extract::{CurrentUser, Json, Path, Query};
use crate::state::ServerState;

/// `offset` is the 1-based page number.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleInput {
    #[serde(default)]
    pub role: String,
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(get_one).post(set_role).delete(delete_one))
}

#[utoipa::path(get, path = "/api/users", tag = "users", params(("limit" = Option<u32>, Query, description = "Page size, default 10"), ("offset" = Option<u32>, Query, description = "1-based page, default 1")), responses((status = 200, description = "Users other than the caller", body = crate::openapi::UserPageDoc), (status = 403, description = "Admins only", body = crate::openapi::ErrorBody), (status = 404, description = "No users found", body = crate::openapi::ErrorBody)))]
pub async fn list(State(state): State<ServerState>, me: CurrentUser, Query(q): Query<UserListQuery>) -> Result<Json<UserPage>, JsonApiError> {
    me.require_admin()?;
    let page = state.users.list(me.0.id, Pagination::from_query(q.offset, q.limit)).await?;
    Ok(Json(page))
}

#[utoipa::path(get, path = "/api/users/{id}", tag = "users", params(("id" = Uuid, Path, description = "User id")), responses((status = 200, description = "User", body = crate::openapi::UserOutputDoc), (status = 404, description = "User not found", body = crate::openapi::ErrorBody)))]
pub async fn get_one(State(state): State<ServerState>, _me: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<UserOutput>, JsonApiError> {
    let user = state.users.get(id).await?;
    Ok(Json(UserOutput { user }))
}

#[utoipa::path(post, path = "/api/users/{id}", tag = "users", params(("id" = Uuid, Path, description = "User id")), request_body = crate::openapi::RoleRequest, responses((status = 200, description = "Role changed", body = crate::openapi::UserMessageDoc), (status = 400, description = "Invalid role", body = crate::openapi::ErrorBody), (status = 404, description = "User not found", body = crate::openapi::ErrorBody)))]
pub async fn set_role(State(state): State<ServerState>, me: CurrentUser, Path(id): Path<Uuid>, Json(input): Json<RoleInput>) -> Result<Json<UserMessage>, JsonApiError> {
    me.require_admin()?;
    let user = state.users.change_role(id, &input.role).await?;
    Ok(Json(UserMessage { message: "Role updated successfully", user }))
}

#[utoipa::path(delete, path = "/api/users/{id}", tag = "users", params(("id" = Uuid, Path, description = "User id")), responses((status = 200, description = "User deleted", body = crate::openapi::MessageDoc), (status = 404, description = "User not found", body = crate::openapi::ErrorBody)))]
pub async fn delete_one(State(state): State<ServerState>, me: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Message>, JsonApiError> {
    me.require_admin()?;
    state.users.delete(id).await?;
    Ok(Json(Message::new("User deleted successfully")))
}
