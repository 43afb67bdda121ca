//! Catalog route handlers (read-only).

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use marigold_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::{Coupon, Product};
use crate::services::CouponService;
use crate::state::AppState;

/// `GET /products/{id}` - product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(product))
}

/// `GET /products/{id}/coupons` - active coupons covering the product.
#[instrument(skip(state))]
pub async fn coupons(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<Coupon>>> {
    let coupons = CouponService::new(state.pool())
        .active_for_product(id)
        .await?;
    Ok(Json(coupons))
}
