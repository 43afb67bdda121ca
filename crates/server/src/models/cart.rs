//! Cart domain types.
//!
//! A cart is the set of a user's cart lines; there is no separate cart
//! header row. Each line is keyed by (user, product, variant) and caches a
//! pricing snapshot that the pipeline recomputes from the catalog on every
//! read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marigold_core::{CartLineId, ProductId, UserId, Variant};

/// One cart line (domain type).
///
/// Invariant: `quantity` is always positive; a mutation that would drive it
/// to zero deletes the row instead.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    /// Unique line ID.
    pub id: CartLineId,
    /// Owning user.
    pub user_id: UserId,
    /// Product in the line.
    pub product_id: ProductId,
    /// Product title snapshot, for display without a catalog round trip.
    pub product_title: String,
    /// List price snapshot at the time of the last mutation.
    pub price: Decimal,
    /// Sale price snapshot at the time of the last mutation.
    pub sale_price: Option<Decimal>,
    /// Units of the product in the cart; always > 0.
    pub quantity: i32,
    /// Selected color/size.
    pub variant: Variant,
    /// Image shown for the selected colorway.
    pub selected_image: Option<String>,
    /// Cached `effective price x quantity`, recomputed on every mutation.
    pub subtotal: Decimal,
    /// When the line was first added.
    pub created_at: DateTime<Utc>,
    /// When the line was last mutated.
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /cart` (add-or-update, replace semantics).
#[derive(Debug, Clone, Deserialize)]
pub struct AddLineInput {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

const fn default_quantity() -> i64 {
    1
}

/// Request body for `PATCH /cart/items`.
///
/// `product_id` (and variant) may be omitted when the user has exactly one
/// cart line.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLineInput {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub quantity: i64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

/// Request body for `DELETE /cart/items`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveLineInput {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

impl AddLineInput {
    /// The variant selection carried by this request.
    #[must_use]
    pub fn variant(&self) -> Variant {
        Variant {
            color: self.color.clone(),
            size: self.size.clone(),
        }
    }
}

impl UpdateLineInput {
    /// The variant selection carried by this request, if any axis is set.
    #[must_use]
    pub fn variant(&self) -> Option<Variant> {
        variant_from_axes(self.color.clone(), self.size.clone())
    }
}

impl RemoveLineInput {
    /// The variant selection carried by this request, if any axis is set.
    #[must_use]
    pub fn variant(&self) -> Option<Variant> {
        variant_from_axes(self.color.clone(), self.size.clone())
    }
}

fn variant_from_axes(color: Option<String>, size: Option<String>) -> Option<Variant> {
    let variant = Variant { color, size };
    (!variant.is_empty()).then_some(variant)
}
