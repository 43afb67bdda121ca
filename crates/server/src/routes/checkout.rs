//! Checkout route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use marigold_core::OrderId;

use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::models::Order;
use crate::services::CheckoutService;
use crate::state::AppState;

/// `POST /checkout` - place an order from the user's priced cart.
#[instrument(skip(state))]
pub async fn place_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<(StatusCode, Json<Order>)> {
    let order = CheckoutService::new(state.pool(), state.tax_rate())
        .place_order(user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /orders/{id}` - fetch one of the user's orders.
#[instrument(skip(state))]
pub async fn show_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = CheckoutService::new(state.pool(), state.tax_rate())
        .get_order(user_id, id)
        .await?;
    Ok(Json(order))
}
