//! Coupon rule domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marigold_core::{CouponId, CouponScope, DiscountType, ProductId};

/// A coupon rule (domain type).
///
/// The `discount` field is overloaded by the business rules: for fixed
/// coupons it is the amount off, for percentage coupons it is both the
/// eligibility threshold and the cap on the computed percentage amount
/// (the percentage magnitude itself lives in `offer_discount`).
#[derive(Debug, Clone, Serialize)]
pub struct Coupon {
    /// Unique coupon ID.
    pub id: CouponId,
    /// Uppercase, unique redemption code.
    pub code: String,
    /// Flat discount magnitude; doubles as threshold/cap for percentage
    /// coupons.
    pub discount: Decimal,
    /// How the discount is computed.
    pub discount_type: DiscountType,
    /// What eligibility is gated on.
    pub scope: CouponScope,
    /// Products the coupon targets; empty means every product in scope.
    pub products: Vec<ProductId>,
    /// Minimum cart total, required for min-purchase coupons.
    pub min_purchase_amount: Option<Decimal>,
    /// Whether the coupon can currently be applied.
    pub is_active: bool,
    /// Times the coupon has been redeemed.
    pub usage_count: i32,
    /// Redemption cap; `None` means unlimited.
    pub max_usage: Option<i32>,
    /// Percentage magnitude for percentage coupons.
    pub offer_discount: Option<Decimal>,
    /// When the coupon was created.
    pub created_at: DateTime<Utc>,
    /// When the coupon was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Whether this coupon's scope covers the given product.
    ///
    /// Min-purchase coupons cover every product (their gate is the cart
    /// total, checked later). Product coupons with an empty product set are
    /// global; otherwise the product must be targeted.
    #[must_use]
    pub fn covers_product(&self, product_id: ProductId) -> bool {
        match self.scope {
            CouponScope::MinPurchase => true,
            CouponScope::Product => {
                self.products.is_empty() || self.products.contains(&product_id)
            }
        }
    }

    /// Whether the redemption cap has been reached.
    #[must_use]
    pub fn is_usage_exhausted(&self) -> bool {
        self.max_usage.is_some_and(|max| self.usage_count >= max)
    }

    /// The percentage magnitude, zero when unset.
    #[must_use]
    pub fn offer_percent(&self) -> Decimal {
        self.offer_discount.unwrap_or(Decimal::ZERO)
    }
}

/// Input for creating a coupon.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCouponInput {
    pub code: String,
    pub discount: Decimal,
    pub discount_type: DiscountType,
    pub scope: CouponScope,
    #[serde(default)]
    pub products: Vec<ProductId>,
    #[serde(default)]
    pub min_purchase_amount: Option<Decimal>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub max_usage: Option<i32>,
    #[serde(default)]
    pub offer_discount: Option<Decimal>,
}

const fn default_is_active() -> bool {
    true
}

/// Partial update for a coupon; unset fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCouponInput {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub discount_type: Option<DiscountType>,
    #[serde(default)]
    pub scope: Option<CouponScope>,
    #[serde(default)]
    pub products: Option<Vec<ProductId>>,
    #[serde(default)]
    pub min_purchase_amount: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub max_usage: Option<Option<i32>>,
    #[serde(default)]
    pub offer_discount: Option<Decimal>,
}

/// Filters for the coupon listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponFilter {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub discount_type: Option<DiscountType>,
    #[serde(default)]
    pub scope: Option<CouponScope>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(scope: CouponScope, products: Vec<ProductId>) -> Coupon {
        Coupon {
            id: CouponId::generate(),
            code: "FESTIVE10".to_string(),
            discount: "100".parse().expect("decimal"),
            discount_type: DiscountType::Percentage,
            scope,
            products,
            min_purchase_amount: None,
            is_active: true,
            usage_count: 0,
            max_usage: None,
            offer_discount: Some("10".parse().expect("decimal")),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_product_set_is_global() {
        let any_product = ProductId::generate();
        assert!(coupon(CouponScope::Product, vec![]).covers_product(any_product));
    }

    #[test]
    fn targeted_coupon_covers_only_its_products() {
        let targeted = ProductId::generate();
        let other = ProductId::generate();
        let c = coupon(CouponScope::Product, vec![targeted]);
        assert!(c.covers_product(targeted));
        assert!(!c.covers_product(other));
    }

    #[test]
    fn min_purchase_coupons_cover_everything() {
        let c = coupon(CouponScope::MinPurchase, vec![ProductId::generate()]);
        assert!(c.covers_product(ProductId::generate()));
    }

    #[test]
    fn usage_cap_detection() {
        let mut c = coupon(CouponScope::Product, vec![]);
        assert!(!c.is_usage_exhausted());
        c.max_usage = Some(3);
        c.usage_count = 2;
        assert!(!c.is_usage_exhausted());
        c.usage_count = 3;
        assert!(c.is_usage_exhausted());
    }
}
