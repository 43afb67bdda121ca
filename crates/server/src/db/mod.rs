//! Database operations for the commerce API.
//!
//! # Tables
//!
//! - `products` - Catalog (prices, stock, category, image sets)
//! - `coupons` - Coupon rules
//! - `cart_lines` - One row per (user, product, variant)
//! - `orders` / `order_items` - Placed orders
//!
//! Queries are runtime-checked (`sqlx::query_as`) rather than macro-checked
//! so the crate builds without a live database; row structs derive
//! `sqlx::FromRow` and convert into the domain models in [`crate::models`].
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p marigold-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod cart;
pub mod coupons;
pub mod orders;
pub mod products;

pub use cart::CartRepository;
pub use coupons::CouponRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

/// Errors from the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate coupon code).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
