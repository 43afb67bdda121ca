//! Cart line repository.
//!
//! Cart writes go through a single-statement upsert: concurrent writers for
//! the same (user, product, variant) key race on one row and last write
//! wins, rather than a find-then-save losing updates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use marigold_core::{CartLineId, ProductId, UserId, Variant};

use super::RepositoryError;
use crate::models::CartLine;

/// Internal row type for cart line queries.
///
/// Unset variant axes are stored as empty strings so the uniqueness
/// constraint treats them as equal; the domain type maps them back to
/// `None`.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    product_title: String,
    price: Decimal,
    sale_price: Option<Decimal>,
    quantity: i32,
    color: String,
    size: String,
    selected_image: Option<String>,
    subtotal: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartLineId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            product_title: row.product_title,
            price: row.price,
            sale_price: row.sale_price,
            quantity: row.quantity,
            variant: Variant {
                color: (!row.color.is_empty()).then_some(row.color),
                size: (!row.size.is_empty()).then_some(row.size),
            },
            selected_image: row.selected_image,
            subtotal: row.subtotal,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_LINE: &str = "SELECT id, user_id, product_id, product_title, price, sale_price, \
     quantity, color, size, selected_image, subtotal, created_at, updated_at FROM cart_lines";

/// Everything needed to write a cart line in one statement.
#[derive(Debug, Clone)]
pub struct UpsertLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_title: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub quantity: i32,
    pub variant: Variant,
    pub selected_image: Option<String>,
    pub subtotal: Decimal,
}

/// Repository for cart line database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All of a user's cart lines, oldest first.
    ///
    /// The ordering matters: the pricing pipeline's de-duplication and
    /// coupon selection both key off "first seen".
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!(
            "{SELECT_LINE} WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Insert a line, or replace the quantity and pricing snapshot of the
    /// existing line for the same (user, product, variant) key.
    ///
    /// Replace (not add) semantics: the stored quantity becomes exactly the
    /// requested quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_line(&self, line: &UpsertLine) -> Result<CartLine, RepositoryError> {
        let (color, size) = line.variant.key();
        let row = sqlx::query_as::<_, CartLineRow>(
            "INSERT INTO cart_lines \
                 (user_id, product_id, product_title, price, sale_price, quantity, \
                  color, size, selected_image, subtotal) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (user_id, product_id, color, size) DO UPDATE SET \
                 product_title = EXCLUDED.product_title, \
                 price = EXCLUDED.price, \
                 sale_price = EXCLUDED.sale_price, \
                 quantity = EXCLUDED.quantity, \
                 selected_image = EXCLUDED.selected_image, \
                 subtotal = EXCLUDED.subtotal, \
                 updated_at = now() \
             RETURNING id, user_id, product_id, product_title, price, sale_price, \
                       quantity, color, size, selected_image, subtotal, created_at, updated_at",
        )
        .bind(line.user_id.as_uuid())
        .bind(line.product_id.as_uuid())
        .bind(&line.product_title)
        .bind(line.price)
        .bind(line.sale_price)
        .bind(line.quantity)
        .bind(color)
        .bind(size)
        .bind(&line.selected_image)
        .bind(line.subtotal)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete the line for a (user, product, variant) key; returns `false`
    /// when no such line existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant: &Variant,
    ) -> Result<bool, RepositoryError> {
        let (color, size) = variant.key();
        let result = sqlx::query(
            "DELETE FROM cart_lines \
             WHERE user_id = $1 AND product_id = $2 AND color = $3 AND size = $4",
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(color)
        .bind(size)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all of a user's lines; returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete all of a user's lines on the caller's transaction (used by
    /// checkout after the order is written).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear_on(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(conn)
            .await?;

        Ok(())
    }
}
