//! Core types for Marigold Commerce.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coupon;
pub mod id;
pub mod money;
pub mod variant;

pub use coupon::{CouponScope, DiscountType, ParseEnumError};
pub use id::*;
pub use money::{effective_price, round_to_cents, round_to_unit};
pub use variant::Variant;
