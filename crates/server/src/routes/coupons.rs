//! Coupon route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marigold_core::{CouponId, CouponScope, DiscountType, ProductId};

use crate::error::Result;
use crate::models::Coupon;
use crate::models::coupon::{CouponFilter, CreateCouponInput, UpdateCouponInput};
use crate::pricing::CategoryTotal;
use crate::services::CouponService;
use crate::services::coupons::{AppliedCoupon, CategoryQuotes};
use crate::state::AppState;

/// Query parameters for `GET /coupons`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub discount_type: Option<DiscountType>,
    #[serde(default)]
    pub scope: Option<CouponScope>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_page() -> i64 {
    1
}

const fn default_limit() -> i64 {
    10
}

/// Request body for `POST /coupons/validate` and `POST /coupons/apply`.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub code: String,
    #[serde(default)]
    pub cart_total: Decimal,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
}

/// Response body for `POST /coupons/validate`.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub coupon: Coupon,
    pub message: String,
}

/// `POST /coupons` - create a coupon.
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateCouponInput>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = CouponService::new(state.pool()).create(input).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// `GET /coupons` - list coupons with filters.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Coupon>>> {
    let filter = CouponFilter {
        code: query.code,
        discount_type: query.discount_type,
        scope: query.scope,
        is_active: query.is_active,
    };
    let coupons = CouponService::new(state.pool())
        .list(&filter, query.page, query.limit)
        .await?;
    Ok(Json(coupons))
}

/// `GET /coupons/{id}` - fetch a coupon by id.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
) -> Result<Json<Coupon>> {
    let coupon = CouponService::new(state.pool()).get(id).await?;
    Ok(Json(coupon))
}

/// `GET /coupons/code/{code}` - fetch a coupon by code.
#[instrument(skip(state))]
pub async fn show_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>> {
    let coupon = CouponService::new(state.pool()).get_by_code(&code).await?;
    Ok(Json(coupon))
}

/// `PATCH /coupons/{id}` - partially update a coupon.
#[instrument(skip(state, input))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
    Json(input): Json<UpdateCouponInput>,
) -> Result<Json<Coupon>> {
    let coupon = CouponService::new(state.pool()).update(id, input).await?;
    Ok(Json(coupon))
}

/// `DELETE /coupons/{id}` - delete a coupon.
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<CouponId>) -> Result<StatusCode> {
    CouponService::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /coupons/validate` - check a coupon against a cart.
#[instrument(skip(state, request))]
pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<ValidateResponse>> {
    let coupon = CouponService::new(state.pool())
        .validate(&request.code, request.cart_total, &request.product_ids)
        .await?;
    Ok(Json(ValidateResponse {
        valid: true,
        coupon,
        message: "Coupon is valid".to_string(),
    }))
}

/// `POST /coupons/apply` - validate and compute the discount breakdown.
#[instrument(skip(state, request))]
pub async fn apply(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<AppliedCoupon>> {
    let applied = CouponService::new(state.pool())
        .apply(&request.code, request.cart_total, &request.product_ids)
        .await?;
    Ok(Json(applied))
}

/// Request body for `POST /coupons/increment-usage`.
#[derive(Debug, Deserialize)]
pub struct IncrementUsageRequest {
    pub code: String,
}

/// `POST /coupons/increment-usage` - record a redemption.
#[instrument(skip(state, request))]
pub async fn increment_usage(
    State(state): State<AppState>,
    Json(request): Json<IncrementUsageRequest>,
) -> Result<Json<Coupon>> {
    let coupon = CouponService::new(state.pool())
        .increment_usage(&request.code)
        .await?;
    Ok(Json(coupon))
}

/// `POST /coupons/best-for-categories` - batch best-coupon quotes.
#[instrument(skip(state, batch))]
pub async fn best_for_categories(
    State(state): State<AppState>,
    Json(batch): Json<Vec<CategoryTotal>>,
) -> Result<Json<CategoryQuotes>> {
    let quotes = CouponService::new(state.pool())
        .best_for_categories(&batch)
        .await?;
    Ok(Json(quotes))
}
