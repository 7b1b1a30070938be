use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use common::types::Message;
use serde::{Deserialize, Serialize};
use service::listings::{CreateListingInput, Listing, ListingPage, UpdateListingInput};
use service::pagination::Pagination;
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::extract::{CurrentUser, Json, Path, Query};
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListingMessage {
    pub message: &'static str,
    pub service: Listing,
}

#[derive(Debug, Serialize)]
pub struct ListingOutput {
    pub service: Listing,
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).patch(update).delete(delete_one))
}

#[utoipa::path(get, path = "/api/services", tag = "services", params(("category" = Option<String>, Query, description = "Exact category"), ("page" = Option<u32>, Query, description = "1-based page, default 1"), ("limit" = Option<u32>, Query, description = "Page size, default 10")), responses((status = 200, description = "Listings, newest first", body = crate::openapi::ListingPageDoc), (status = 403, description = "Admins or freelancers only", body = crate::openapi::ErrorBody), (status = 404, description = "No services found", body = crate::openapi::ErrorBody)))]
pub async fn list(State(state): State<ServerState>, me: CurrentUser, Query(q): Query<ListingQuery>) -> Result<Json<ListingPage>, JsonApiError> {
    me.require_admin_or_freelancer()?;
    let page = state.listings.list(q.category.as_deref(), Pagination::from_query(q.page, q.limit)).await?;
    Ok(Json(page))
}

#[utoipa::path(post, path = "/api/services", tag = "services", request_body = crate::openapi::CreateListingRequest, responses((status = 201, description = "Listing created", body = crate::openapi::ListingMessageDoc), (status = 400, description = "All fields are required", body = crate::openapi::ErrorBody), (status = 403, description = "Admins or freelancers only", body = crate::openapi::ErrorBody)))]
pub async fn create(State(state): State<ServerState>, me: CurrentUser, Json(input): Json<CreateListingInput>) -> Result<(StatusCode, Json<ListingMessage>), JsonApiError> {
    me.require_admin_or_freelancer()?;
    let service = state.listings.create(me.0.id, input).await?;
    Ok((StatusCode::CREATED, Json(ListingMessage { message: "Service created successfully", service })))
}

#[utoipa::path(get, path = "/api/services/{id}", tag = "services", params(("id" = Uuid, Path, description = "Listing id")), responses((status = 200, description = "Listing", body = crate::openapi::ListingOutputDoc), (status = 404, description = "Service not found", body = crate::openapi::ErrorBody)))]
pub async fn get_one(State(state): State<ServerState>, _me: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<ListingOutput>, JsonApiError> {
    let service = state.listings.get(id).await?;
    Ok(Json(ListingOutput { service }))
}

#[utoipa::path(patch, path = "/api/services/{id}", tag = "services", params(("id" = Uuid, Path, description = "Listing id")), request_body = crate::openapi::UpdateListingRequest, responses((status = 200, description = "Listing updated", body = crate::openapi::ListingMessageDoc), (status = 403, description = "Not the owner", body = crate::openapi::ErrorBody), (status = 404, description = "Service not found", body = crate::openapi::ErrorBody)))]
pub async fn update(State(state): State<ServerState>, me: CurrentUser, Path(id): Path<Uuid>, Json(input): Json<UpdateListingInput>) -> Result<Json<ListingMessage>, JsonApiError> {
    let service = state.listings.update(me.0.id, id, input).await?;
    Ok(Json(ListingMessage { message: "Service updated successfully", service }))
}

#[utoipa::path(delete, path = "/api/services/{id}", tag = "services", params(("id" = Uuid, Path, description = "Listing id")), responses((status = 200, description = "Listing deleted", body = crate::openapi::MessageDoc), (status = 403, description = "Neither owner nor admin", body = crate::openapi::ErrorBody), (status = 404, description = "Service not found", body = crate::openapi::ErrorBody)))]
pub async fn delete_one(State(state): State<ServerState>, me: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Message>, JsonApiError> {
    state.listings.delete(me.0.id, me.0.role, id).await?;
    Ok(Json(Message::new("Service deleted successfully")))
}
