use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use service::orders::Order;
use service::payments::CheckoutInput;

use crate::errors::JsonApiError;
use crate::extract::{CurrentUser, Json};
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSuccessInput {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutUrl {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct OrderMessage {
    pub message: &'static str,
    pub order: Order,
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/checkout-success", post(checkout_success))
}

#[utoipa::path(post, path = "/api/payments/create-checkout-session", tag = "payments", request_body = crate::openapi::CheckoutRequestDoc, responses((status = 200, description = "Checkout redirect URL", body = crate::openapi::CheckoutUrlDoc), (status = 400, description = "Missing required fields", body = crate::openapi::ErrorBody), (status = 404, description = "Service not found", body = crate::openapi::ErrorBody)))]
pub async fn create_checkout_session(State(state): State<ServerState>, me: CurrentUser, Json(input): Json<CheckoutInput>) -> Result<Json<CheckoutUrl>, JsonApiError> {
    let url = state.checkout.create_checkout_session(me.0.id, input).await?;
    Ok(Json(CheckoutUrl { url }))
}

#[utoipa::path(post, path = "/api/payments/checkout-success", tag = "payments", request_body = crate::openapi::CheckoutSuccessRequest, responses((status = 201, description = "Order recorded (or the already recorded order on replay)", body = crate::openapi::OrderMessageDoc), (status = 400, description = "Payment not completed", body = crate::openapi::ErrorBody), (status = 403, description = "Session opened by another user", body = crate::openapi::ErrorBody), (status = 404, description = "Session not found", body = crate::openapi::ErrorBody)))]
pub async fn checkout_success(State(state): State<ServerState>, me: CurrentUser, Json(input): Json<CheckoutSuccessInput>) -> Result<(StatusCode, Json<OrderMessage>), JsonApiError> {
    let order = state.checkout.complete_checkout(me.0.id, &input.session_id).await?;
    Ok((StatusCode::CREATED, Json(OrderMessage { message: "Order created successfully", order })))
}
