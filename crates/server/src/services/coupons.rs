//! Coupon management, validation, and application.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use marigold_core::{CouponId, CouponScope, DiscountType, ProductId, round_to_cents};

use crate::db::{CouponRepository, RepositoryError};
use crate::models::Coupon;
use crate::models::coupon::{CouponFilter, CreateCouponInput, UpdateCouponInput};
use crate::pricing::{self, CategoryQuote, CategoryTotal};

const MIN_CODE_LENGTH: usize = 3;
const MAX_CODE_LENGTH: usize = 20;

/// Errors from coupon operations.
#[derive(Debug, Error)]
pub enum CouponError {
    /// No coupon with the given id/code.
    #[error("coupon not found")]
    NotFound,

    /// The code is already taken by another coupon.
    #[error("coupon code already taken: {0}")]
    CodeTaken(String),

    /// The code is too short, too long, or blank.
    #[error("invalid coupon code: {0}")]
    InvalidCode(String),

    /// A percentage magnitude outside (0, 100].
    #[error("invalid percentage: {0}")]
    InvalidPercentage(Decimal),

    /// A negative discount value.
    #[error("invalid discount: {0}")]
    InvalidDiscount(Decimal),

    /// Min-purchase coupons must carry their threshold.
    #[error("minimum purchase amount is required for minimum purchase coupons")]
    MissingMinPurchaseAmount,

    /// The coupon exists but is switched off.
    #[error("coupon is not active")]
    Inactive,

    /// The redemption cap has been reached.
    #[error("coupon usage limit exceeded")]
    UsageLimitExceeded,

    /// The cart total is below the coupon's minimum purchase amount.
    #[error("minimum purchase amount of {required} required")]
    MinPurchaseNotMet { required: Decimal },

    /// None of the cart's products are covered by the coupon.
    #[error("no eligible products in cart for this coupon")]
    NoEligibleProducts,

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The discount breakdown returned by [`CouponService::apply`].
#[derive(Debug, Clone, Serialize)]
pub struct AppliedCoupon {
    pub coupon_code: String,
    pub discount_type: DiscountType,
    /// The coupon's flat `discount` field.
    pub discount_value: Decimal,
    /// Amount taken off, rounded to two decimal places.
    pub discount_amount: Decimal,
    pub original_amount: Decimal,
    pub final_amount: Decimal,
    pub savings: Decimal,
}

/// The batch response of [`CouponService::best_for_categories`].
#[derive(Debug, Clone, Serialize)]
pub struct CategoryQuotes {
    pub coupon_details: Vec<CategoryQuote>,
    pub total_discount: Decimal,
}

/// Service for coupon rules.
pub struct CouponService<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponService<'a> {
    /// Create a new coupon service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a coupon after validating its rules.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::InvalidCode`, `InvalidPercentage`,
    /// `InvalidDiscount`, `MissingMinPurchaseAmount`, or `CodeTaken` when
    /// validation fails.
    pub async fn create(&self, mut input: CreateCouponInput) -> Result<Coupon, CouponError> {
        input.code = normalize_code(&input.code)?;
        validate_rules(
            input.discount,
            input.discount_type,
            input.scope,
            input.min_purchase_amount,
            input.offer_discount,
        )?;

        let repo = CouponRepository::new(self.pool);
        if repo.is_code_taken(&input.code, None).await? {
            return Err(CouponError::CodeTaken(input.code));
        }

        let coupon = repo.create(&input).await.map_err(conflict_to_taken)?;
        tracing::info!(code = %coupon.code, "coupon created");
        Ok(coupon)
    }

    /// Fetch a coupon by id.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` when missing.
    pub async fn get(&self, id: CouponId) -> Result<Coupon, CouponError> {
        CouponRepository::new(self.pool)
            .get(id)
            .await?
            .ok_or(CouponError::NotFound)
    }

    /// Fetch a coupon by code (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` when missing.
    pub async fn get_by_code(&self, code: &str) -> Result<Coupon, CouponError> {
        CouponRepository::new(self.pool)
            .find_by_code(&code.trim().to_uppercase())
            .await?
            .ok_or(CouponError::NotFound)
    }

    /// List coupons with filters and pagination.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Repository` if the query fails.
    pub async fn list(
        &self,
        filter: &CouponFilter,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Coupon>, CouponError> {
        let limit = limit.clamp(1, 100);
        let offset = (page.max(1) - 1) * limit;
        Ok(CouponRepository::new(self.pool)
            .list(filter, limit, offset)
            .await?)
    }

    /// Apply a partial update, re-running the creation rules on the result.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` when missing, plus the validation
    /// errors of [`Self::create`].
    pub async fn update(
        &self,
        id: CouponId,
        mut input: UpdateCouponInput,
    ) -> Result<Coupon, CouponError> {
        let repo = CouponRepository::new(self.pool);
        let existing = repo.get(id).await?.ok_or(CouponError::NotFound)?;

        if let Some(code) = &input.code {
            let normalized = normalize_code(code)?;
            if repo.is_code_taken(&normalized, Some(id)).await? {
                return Err(CouponError::CodeTaken(normalized));
            }
            input.code = Some(normalized);
        }

        // Validate the coupon as it will look after the update.
        validate_rules(
            input.discount.unwrap_or(existing.discount),
            input.discount_type.unwrap_or(existing.discount_type),
            input.scope.unwrap_or(existing.scope),
            input.min_purchase_amount.or(existing.min_purchase_amount),
            input.offer_discount.or(existing.offer_discount),
        )?;

        let coupon = repo.update(id, &input).await.map_err(conflict_to_taken)?;
        Ok(coupon)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` when missing.
    pub async fn delete(&self, id: CouponId) -> Result<(), CouponError> {
        if CouponRepository::new(self.pool).delete(id).await? {
            Ok(())
        } else {
            Err(CouponError::NotFound)
        }
    }

    /// Check a coupon can be applied to a cart.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound`, `Inactive`, `UsageLimitExceeded`,
    /// `MinPurchaseNotMet`, or `NoEligibleProducts`.
    pub async fn validate(
        &self,
        code: &str,
        cart_total: Decimal,
        product_ids: &[ProductId],
    ) -> Result<Coupon, CouponError> {
        let coupon = self.get_by_code(code).await?;

        if !coupon.is_active {
            return Err(CouponError::Inactive);
        }
        if coupon.is_usage_exhausted() {
            return Err(CouponError::UsageLimitExceeded);
        }
        if coupon.scope == CouponScope::MinPurchase {
            let required = coupon.min_purchase_amount.unwrap_or(Decimal::ZERO);
            if cart_total < required {
                return Err(CouponError::MinPurchaseNotMet { required });
            }
        }
        if coupon.scope == CouponScope::Product
            && !coupon.products.is_empty()
            && !product_ids.iter().any(|id| coupon.products.contains(id))
        {
            return Err(CouponError::NoEligibleProducts);
        }

        Ok(coupon)
    }

    /// Validate a coupon and compute its discount breakdown for a cart
    /// total.
    ///
    /// Unlike the cart pipeline, this code path treats a percentage
    /// coupon's flat `discount` field as the percentage magnitude, matching
    /// the standalone apply endpoint's contract.
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate`].
    pub async fn apply(
        &self,
        code: &str,
        cart_total: Decimal,
        product_ids: &[ProductId],
    ) -> Result<AppliedCoupon, CouponError> {
        let coupon = self.validate(code, cart_total, product_ids).await?;

        let raw = match coupon.discount_type {
            DiscountType::Percentage => cart_total * coupon.discount / Decimal::ONE_HUNDRED,
            DiscountType::Fixed => coupon.discount.min(cart_total),
        };
        let discount_amount = round_to_cents(raw.min(cart_total));
        let final_amount = round_to_cents(cart_total - discount_amount);

        Ok(AppliedCoupon {
            coupon_code: coupon.code,
            discount_type: coupon.discount_type,
            discount_value: coupon.discount,
            discount_amount,
            original_amount: cart_total,
            final_amount,
            savings: discount_amount,
        })
    }

    /// Record a redemption, guarded by the coupon's usage cap.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` for unknown codes and
    /// `CouponError::UsageLimitExceeded` when the cap is hit.
    pub async fn increment_usage(&self, code: &str) -> Result<Coupon, CouponError> {
        let coupon = self.get_by_code(code).await?;

        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        if !CouponRepository::increment_usage(&mut conn, &coupon.code).await? {
            return Err(CouponError::UsageLimitExceeded);
        }
        drop(conn);

        self.get_by_code(code).await
    }

    /// Active coupons whose scope covers a product.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Repository` if the query fails.
    pub async fn active_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Coupon>, CouponError> {
        Ok(CouponRepository::new(self.pool)
            .active_for_product(product_id)
            .await?)
    }

    /// For each category, find the best applicable coupon and quote the
    /// discounted amount. Categories without an applicable coupon are
    /// omitted, matching the batch contract.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Repository` if a query fails.
    pub async fn best_for_categories(
        &self,
        batch: &[CategoryTotal],
    ) -> Result<CategoryQuotes, CouponError> {
        let repo = CouponRepository::new(self.pool);
        let mut coupon_details = Vec::new();
        for item in batch {
            let Some(coupon) = repo.best_for_products(&item.ids, item.total).await? else {
                continue;
            };
            coupon_details.push(pricing::category_quote(&item.category, item.total, &coupon));
        }

        let total_discount = coupon_details.iter().map(|q| q.final_discount).sum();
        Ok(CategoryQuotes {
            coupon_details,
            total_discount,
        })
    }
}

/// Uppercase and bound-check a coupon code.
fn normalize_code(code: &str) -> Result<String, CouponError> {
    let normalized = code.trim().to_uppercase();
    if normalized.len() < MIN_CODE_LENGTH || normalized.len() > MAX_CODE_LENGTH {
        return Err(CouponError::InvalidCode(code.to_string()));
    }
    Ok(normalized)
}

/// Creation-time coupon rules: non-negative discounts, percentage
/// magnitudes within (0, 100], and a threshold on min-purchase coupons.
fn validate_rules(
    discount: Decimal,
    discount_type: DiscountType,
    scope: CouponScope,
    min_purchase_amount: Option<Decimal>,
    offer_discount: Option<Decimal>,
) -> Result<(), CouponError> {
    if discount < Decimal::ZERO {
        return Err(CouponError::InvalidDiscount(discount));
    }
    if discount_type == DiscountType::Percentage {
        let percent = offer_discount.ok_or(CouponError::InvalidPercentage(Decimal::ZERO))?;
        if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(CouponError::InvalidPercentage(percent));
        }
    }
    if scope == CouponScope::MinPurchase && min_purchase_amount.is_none() {
        return Err(CouponError::MissingMinPurchaseAmount);
    }
    if let Some(amount) = min_purchase_amount {
        if amount < Decimal::ZERO {
            return Err(CouponError::InvalidDiscount(amount));
        }
    }
    Ok(())
}

fn conflict_to_taken(err: RepositoryError) -> CouponError {
    match err {
        RepositoryError::Conflict(msg) => CouponError::CodeTaken(msg),
        other => CouponError::Repository(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    #[test]
    fn codes_are_uppercased_and_bounded() {
        assert_eq!(normalize_code(" festive20 ").expect("valid"), "FESTIVE20");
        assert!(matches!(
            normalize_code("ab"),
            Err(CouponError::InvalidCode(_))
        ));
        assert!(matches!(
            normalize_code("THIRTYCHARACTERSLONGCOUPONCODE"),
            Err(CouponError::InvalidCode(_))
        ));
    }

    #[test]
    fn percentage_coupons_need_a_magnitude_in_range() {
        let ok = validate_rules(
            d("100"),
            DiscountType::Percentage,
            CouponScope::Product,
            None,
            Some(d("20")),
        );
        assert!(ok.is_ok());

        assert!(matches!(
            validate_rules(
                d("100"),
                DiscountType::Percentage,
                CouponScope::Product,
                None,
                None,
            ),
            Err(CouponError::InvalidPercentage(_))
        ));
        assert!(matches!(
            validate_rules(
                d("100"),
                DiscountType::Percentage,
                CouponScope::Product,
                None,
                Some(d("130")),
            ),
            Err(CouponError::InvalidPercentage(_))
        ));
    }

    #[test]
    fn min_purchase_scope_requires_threshold() {
        assert!(matches!(
            validate_rules(
                d("50"),
                DiscountType::Fixed,
                CouponScope::MinPurchase,
                None,
                None,
            ),
            Err(CouponError::MissingMinPurchaseAmount)
        ));
        assert!(
            validate_rules(
                d("50"),
                DiscountType::Fixed,
                CouponScope::MinPurchase,
                Some(d("500")),
                None,
            )
            .is_ok()
        );
    }

    #[test]
    fn negative_discount_is_rejected() {
        assert!(matches!(
            validate_rules(
                d("-5"),
                DiscountType::Fixed,
                CouponScope::Product,
                None,
                None,
            ),
            Err(CouponError::InvalidDiscount(_))
        ));
    }
}
