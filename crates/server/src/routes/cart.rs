//! Cart route handlers.
//!
//! Every response is the freshly priced cart, so the client never has to
//! recompute totals after a mutation.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::models::cart::{AddLineInput, RemoveLineInput, UpdateLineInput};
use crate::pricing::PricedCart;
use crate::services::CartService;
use crate::state::AppState;

/// `GET /cart` - the user's priced cart.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<PricedCart>> {
    let cart = CartService::new(state.pool(), state.tax_rate())
        .priced_cart(user_id)
        .await?;
    Ok(Json(cart))
}

/// `POST /cart` - add a product, or replace the existing line's quantity.
#[instrument(skip(state, input))]
pub async fn add(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(input): Json<AddLineInput>,
) -> Result<Json<PricedCart>> {
    let cart = CartService::new(state.pool(), state.tax_rate())
        .add_or_update(user_id, input)
        .await?;
    Ok(Json(cart))
}

/// `PATCH /cart/items` - set a line's quantity (0 deletes the line).
#[instrument(skip(state, input))]
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(input): Json<UpdateLineInput>,
) -> Result<Json<PricedCart>> {
    let cart = CartService::new(state.pool(), state.tax_rate())
        .update_line(user_id, input)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /cart/items` - remove a line.
#[instrument(skip(state, input))]
pub async fn remove(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(input): Json<RemoveLineInput>,
) -> Result<Json<PricedCart>> {
    let cart = CartService::new(state.pool(), state.tax_rate())
        .remove_line(user_id, input)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /cart` - clear the cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<PricedCart>> {
    let cart = CartService::new(state.pool(), state.tax_rate())
        .clear(user_id)
        .await?;
    Ok(Json(cart))
}
