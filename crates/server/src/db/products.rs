//! Product repository for catalog access.
//!
//! The pricing pipeline only reads from the catalog; writes are limited to
//! product creation (seeding/admin tooling) and the conditional stock
//! decrement used at checkout.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use marigold_core::ProductId;

use super::RepositoryError;
use crate::models::Product;
use crate::models::product::CreateProductInput;

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock_quantity: i32,
    category: Option<String>,
    images: Vec<String>,
    color_images: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let color_images: HashMap<String, Vec<String>> = serde_json::from_value(row.color_images)
            .map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid color_images for product: {e}"))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            title: row.title,
            description: row.description,
            price: row.price,
            sale_price: row.sale_price,
            stock_quantity: row.stock_quantity,
            category: row.category,
            images: row.images,
            color_images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_PRODUCT: &str = "SELECT id, title, description, price, sale_price, stock_quantity, \
     category, images, color_images, created_at, updated_at FROM products";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Get several products at once, keyed by ID.
    ///
    /// Missing IDs are simply absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let uuids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE id = ANY($1)"))
            .bind(&uuids)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Product::try_from(row).map(|p| (p.id, p)))
            .collect()
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: CreateProductInput) -> Result<Product, RepositoryError> {
        let color_images = serde_json::to_value(&input.color_images).map_err(|e| {
            RepositoryError::DataCorruption(format!("unserializable color_images: {e}"))
        })?;

        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO products \
                 (title, description, price, sale_price, stock_quantity, category, images, color_images) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, title, description, price, sale_price, stock_quantity, \
                       category, images, color_images, created_at, updated_at",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.stock_quantity)
        .bind(&input.category)
        .bind(&input.images)
        .bind(color_images)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Atomically reserve stock for a checkout line.
    ///
    /// The decrement only happens when enough stock remains
    /// (`stock_quantity >= quantity` in the same statement), closing the
    /// read-then-write double-sell race. Runs on the caller's transaction.
    ///
    /// Returns `false` when stock was insufficient (or the product is gone).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn reserve_stock(
        conn: &mut PgConnection,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products \
             SET stock_quantity = stock_quantity - $2, updated_at = now() \
             WHERE id = $1 AND stock_quantity >= $2",
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
