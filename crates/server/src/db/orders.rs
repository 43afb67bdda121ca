//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use marigold_core::{OrderId, OrderItemId, ProductId, UserId, Variant};

use super::RepositoryError;
use crate::models::{Order, OrderItem};

/// Internal row type for order headers.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    subtotal: Decimal,
    discount: Decimal,
    coupon_code: Option<String>,
    gst: Decimal,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
}

/// Internal row type for order items.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_title: String,
    unit_price: Decimal,
    quantity: i32,
    color: String,
    size: String,
    subtotal: Decimal,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            user_id: UserId::new(self.user_id),
            items,
            subtotal: self.subtotal,
            discount: self.discount,
            coupon_code: self.coupon_code,
            gst: self.gst,
            total_amount: self.total_amount,
            created_at: self.created_at,
        }
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            product_title: row.product_title,
            unit_price: row.unit_price,
            quantity: row.quantity,
            variant: Variant {
                color: (!row.color.is_empty()).then_some(row.color),
                size: (!row.size.is_empty()).then_some(row.size),
            },
            subtotal: row.subtotal,
        }
    }
}

/// A new order header, written at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub coupon_code: Option<String>,
    pub gst: Decimal,
    pub total_amount: Decimal,
}

/// A new order line, written at checkout.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_title: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub variant: Variant,
    pub subtotal: Decimal,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write an order and its items on the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn create_on(
        conn: &mut PgConnection,
        order: &NewOrder,
        items: &[NewOrderItem],
    ) -> Result<Order, RepositoryError> {
        let header = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders \
                 (order_number, user_id, subtotal, discount, coupon_code, gst, total_amount) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, order_number, user_id, subtotal, discount, coupon_code, gst, \
                       total_amount, created_at",
        )
        .bind(&order.order_number)
        .bind(order.user_id.as_uuid())
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(&order.coupon_code)
        .bind(order.gst)
        .bind(order.total_amount)
        .fetch_one(&mut *conn)
        .await?;

        let mut stored_items = Vec::with_capacity(items.len());
        for item in items {
            let (color, size) = item.variant.key();
            let row = sqlx::query_as::<_, OrderItemRow>(
                "INSERT INTO order_items \
                     (order_id, product_id, product_title, unit_price, quantity, color, size, subtotal) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING id, order_id, product_id, product_title, unit_price, quantity, \
                           color, size, subtotal",
            )
            .bind(header.id)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_title)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(color)
            .bind(size)
            .bind(item.subtotal)
            .fetch_one(&mut *conn)
            .await?;
            stored_items.push(row.into());
        }

        Ok(header.into_order(stored_items))
    }

    /// Fetch an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let header = sqlx::query_as::<_, OrderRow>(
            "SELECT id, order_number, user_id, subtotal, discount, coupon_code, gst, \
                    total_amount, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, product_title, unit_price, quantity, \
                    color, size, subtotal \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(Some(
            header.into_order(items.into_iter().map(OrderItem::from).collect()),
        ))
    }
}
