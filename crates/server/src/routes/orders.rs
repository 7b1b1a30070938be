use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use service::orders::OrderSummary;

use crate::errors::JsonApiError;
use crate::extract::{CurrentUser, Json};
use crate::state::ServerState;

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<OrderSummary>,
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/", get(my_orders))
        .route("/freelancer-orders", get(freelancer_orders))
}

#[utoipa::path(get, path = "/api/orders", tag = "orders", responses((status = 200, description = "Orders placed by the caller", body = crate::openapi::OrderListDoc), (status = 404, description = "No orders found", body = crate::openapi::ErrorBody)))]
pub async fn my_orders(State(state): State<ServerState>, me: CurrentUser) -> Result<Json<OrderList>, JsonApiError> {
    let orders = state.orders.for_client(me.0.id).await?;
    Ok(Json(OrderList { orders }))
}

#[utoipa::path(get, path = "/api/orders/freelancer-orders", tag = "orders", responses((status = 200, description = "Orders for the caller's listings", body = crate::openapi::OrderListDoc), (status = 404, description = "No orders found", body = crate::openapi::ErrorBody)))]
pub async fn freelancer_orders(State(state): State<ServerState>, me: CurrentUser) -> Result<Json<OrderList>, JsonApiError> {
    let orders = state.orders.for_freelancer(me.0.id).await?;
    Ok(Json(OrderList { orders }))
}
