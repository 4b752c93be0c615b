use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::BookingError;
use crate::models::{Order, TicketRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/order", post(create_order))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    // null и отсутствие поля - одно и то же: пустой заказ
    #[serde(default)]
    pub tickets: Option<Vec<TicketRequest>>,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), BookingError> {
    let Json(payload) = payload?;
    let order = state.orders.create(payload.tickets.unwrap_or_default()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
