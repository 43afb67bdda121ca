//! Order domain types.
//!
//! Orders are the checkout consumer's record of a priced cart at the moment
//! of purchase. Downstream payment/shipping integrations read these rows;
//! this service only creates and fetches them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use marigold_core::{OrderId, OrderItemId, ProductId, UserId, Variant};

/// A placed order (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Human-facing order number (`ORD<millis>`).
    pub order_number: String,
    /// User who placed the order.
    pub user_id: UserId,
    /// Lines captured from the cart at checkout.
    pub items: Vec<OrderItem>,
    /// Sum of item subtotals before discount.
    pub subtotal: Decimal,
    /// Discount applied by the pricing pipeline.
    pub discount: Decimal,
    /// Coupon code behind the discount, if one applied.
    pub coupon_code: Option<String>,
    /// Tax reported alongside the payable amount.
    pub gst: Decimal,
    /// Final payable amount (rounded to a whole currency unit).
    pub total_amount: Decimal,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

/// One line of a placed order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    /// Unique item ID.
    pub id: OrderItemId,
    /// Parent order.
    pub order_id: OrderId,
    /// Ordered product.
    pub product_id: ProductId,
    /// Product title at the time of purchase.
    pub product_title: String,
    /// Effective unit price charged.
    pub unit_price: Decimal,
    /// Units ordered.
    pub quantity: i32,
    /// Selected color/size.
    pub variant: Variant,
    /// `unit_price x quantity`.
    pub subtotal: Decimal,
}
