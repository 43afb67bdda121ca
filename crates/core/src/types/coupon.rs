//! Coupon classification enums.
//!
//! These mirror the two axes a coupon rule is defined on: *how* it discounts
//! (`DiscountType`) and *what it is gated on* (`CouponScope`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an enum from its database/text form fails.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum failed to parse (for error messages).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// How a coupon's discount is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// A percentage of the eligible amount, capped by the coupon's flat
    /// discount value.
    Percentage,
    /// A flat amount off.
    Fixed,
}

impl DiscountType {
    /// The database/text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscountType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(ParseEnumError {
                kind: "discount type",
                value: s.to_string(),
            }),
        }
    }
}

/// What a coupon's eligibility is gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponScope {
    /// Applies to specific products (or every product when the coupon's
    /// product set is empty).
    Product,
    /// Applies once the cart total clears a minimum purchase amount.
    MinPurchase,
}

impl CouponScope {
    /// The database/text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::MinPurchase => "min_purchase",
        }
    }
}

impl std::fmt::Display for CouponScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CouponScope {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(Self::Product),
            "min_purchase" => Ok(Self::MinPurchase),
            _ => Err(ParseEnumError {
                kind: "coupon scope",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_type_round_trips_through_text() {
        for ty in [DiscountType::Percentage, DiscountType::Fixed] {
            assert_eq!(ty.as_str().parse::<DiscountType>(), Ok(ty));
        }
    }

    #[test]
    fn coupon_scope_round_trips_through_text() {
        for scope in [CouponScope::Product, CouponScope::MinPurchase] {
            assert_eq!(scope.as_str().parse::<CouponScope>(), Ok(scope));
        }
    }

    #[test]
    fn unknown_text_is_rejected() {
        let err = "bogof".parse::<DiscountType>().unwrap_err();
        assert_eq!(err.value, "bogof");
    }
}
