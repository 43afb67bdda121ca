//! Checkout: turn a priced cart into an order.
//!
//! The whole operation runs in one transaction. Stock is reserved with a
//! conditional decrement per item; any shortfall rolls the entire order
//! back, so an order is only ever written with every unit accounted for.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use marigold_core::{OrderId, UserId};

use crate::db::orders::{NewOrder, NewOrderItem};
use crate::db::{CartRepository, CouponRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::models::Order;
use crate::pricing::PricedCart;
use crate::services::cart::{CartError, CartService};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A line could not be fulfilled from stock.
    #[error("insufficient stock for {product_title}")]
    InsufficientStock { product_title: String },

    /// The applied coupon hit its redemption cap between pricing and
    /// checkout.
    #[error("coupon usage limit exceeded")]
    CouponExhausted,

    /// No such order (or it belongs to someone else).
    #[error("order not found")]
    OrderNotFound,

    /// Pricing the cart failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Service for placing and fetching orders.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    tax_rate: Decimal,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tax_rate: Decimal) -> Self {
        Self { pool, tax_rate }
    }

    /// Place an order from the user's current cart.
    ///
    /// Prices the cart, writes the order, reserves stock for every line,
    /// records the coupon redemption, and clears the cart - all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `InsufficientStock` (aborting
    /// the whole order), or `CouponExhausted`.
    pub async fn place_order(&self, user_id: UserId) -> Result<Order, CheckoutError> {
        let priced = CartService::new(self.pool, self.tax_rate)
            .priced_cart(user_id)
            .await?;
        if priced.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let order = new_order(user_id, &priced);
        let items = new_items(&priced);

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let stored = OrderRepository::create_on(&mut *tx, &order, &items).await?;

        for item in &items {
            let reserved =
                ProductRepository::reserve_stock(&mut *tx, item.product_id, item.quantity).await?;
            if !reserved {
                return Err(CheckoutError::InsufficientStock {
                    product_title: item.product_title.clone(),
                });
            }
        }

        if let Some(code) = &order.coupon_code {
            if !CouponRepository::increment_usage(&mut *tx, code).await? {
                return Err(CheckoutError::CouponExhausted);
            }
        }

        CartRepository::clear_on(&mut *tx, user_id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_number = %stored.order_number,
            %user_id,
            total = %stored.total_amount,
            "order placed"
        );
        Ok(stored)
    }

    /// Fetch one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` when missing or owned by a
    /// different user.
    pub async fn get_order(&self, user_id: UserId, id: OrderId) -> Result<Order, CheckoutError> {
        let order = OrderRepository::new(self.pool)
            .get(id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(CheckoutError::OrderNotFound)?;
        Ok(order)
    }
}

fn new_order(user_id: UserId, priced: &PricedCart) -> NewOrder {
    NewOrder {
        order_number: format!("ORD{}", Utc::now().timestamp_millis()),
        user_id,
        subtotal: priced.cart_subtotal,
        discount: priced.applied_discount,
        coupon_code: priced.coupon_code.clone(),
        gst: priced.gst,
        total_amount: priced.final_amount,
    }
}

fn new_items(priced: &PricedCart) -> Vec<NewOrderItem> {
    priced
        .lines
        .iter()
        .map(|line| NewOrderItem {
            product_id: line.product_id,
            product_title: line.product_title.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            variant: line.variant.clone(),
            subtotal: line.subtotal,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use marigold_core::{CartLineId, ProductId, Variant};
    use rust_decimal::Decimal;

    use crate::pricing::PricedLine;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    fn priced_cart() -> PricedCart {
        PricedCart {
            lines: vec![PricedLine {
                id: CartLineId::generate(),
                product_id: ProductId::generate(),
                product_title: "Linen Kurta".to_string(),
                quantity: 2,
                variant: Variant::none(),
                price: d("1000"),
                sale_price: Some(d("800")),
                unit_price: d("800"),
                subtotal: d("1600"),
                image: None,
                coupon_eligible: true,
            }],
            cart_subtotal: d("1600"),
            eligible_subtotal: d("1600"),
            coupon_code: Some("FESTIVE20".to_string()),
            coupon_type: Some(marigold_core::DiscountType::Percentage),
            applied_discount: d("100"),
            final_amount: d("1500"),
            gst: d("75.00"),
        }
    }

    #[test]
    fn order_header_captures_the_priced_totals() {
        let user = UserId::generate();
        let order = new_order(user, &priced_cart());
        assert!(order.order_number.starts_with("ORD"));
        assert_eq!(order.subtotal, d("1600"));
        assert_eq!(order.discount, d("100"));
        assert_eq!(order.coupon_code.as_deref(), Some("FESTIVE20"));
        assert_eq!(order.total_amount, d("1500"));
    }

    #[test]
    fn items_mirror_the_priced_lines() {
        let items = new_items(&priced_cart());
        assert_eq!(items.len(), 1);
        let item = items.first().expect("one item");
        assert_eq!(item.unit_price, d("800"));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.subtotal, d("1600"));
    }
}
