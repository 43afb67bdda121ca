//! Demo data seeding command.
//!
//! Inserts a small catalog plus a pair of coupons so the API can be
//! exercised locally right after `mg-cli migrate`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;

use marigold_core::{CouponScope, DiscountType};
use marigold_server::config::Config;
use marigold_server::db::{self, ProductRepository, RepositoryError};
use marigold_server::models::coupon::CreateCouponInput;
use marigold_server::models::product::CreateProductInput;
use marigold_server::services::{CouponError, CouponService};

/// Errors from the seed command.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("configuration error: {0}")]
    Config(#[from] marigold_server::config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("coupon error: {0}")]
    Coupon(#[from] CouponError),
}

fn price(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

/// Insert demo products and coupons.
///
/// # Errors
///
/// Returns `SeedError` if any insert fails (a rerun against an already
/// seeded database fails on the duplicate coupon codes).
pub async fn run() -> Result<(), SeedError> {
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    let products = ProductRepository::new(&pool);

    tracing::info!("Seeding products...");
    let kurta = products
        .create(CreateProductInput {
            title: "Linen Kurta".to_string(),
            description: Some("Handwoven linen kurta".to_string()),
            price: price("1000"),
            sale_price: Some(price("800")),
            stock_quantity: 25,
            category: Some("apparel".to_string()),
            images: vec!["https://img.marigold.example/kurta.jpg".to_string()],
            color_images: HashMap::from([(
                "Indigo".to_string(),
                vec!["https://img.marigold.example/kurta-indigo.jpg".to_string()],
            )]),
        })
        .await?;

    let juttis = products
        .create(CreateProductInput {
            title: "Embroidered Juttis".to_string(),
            description: Some("Hand-embroidered leather juttis".to_string()),
            price: price("1450"),
            sale_price: None,
            stock_quantity: 12,
            category: Some("footwear".to_string()),
            images: vec!["https://img.marigold.example/juttis.jpg".to_string()],
            color_images: HashMap::new(),
        })
        .await?;

    tracing::info!("Seeding coupons...");
    let coupons = CouponService::new(&pool);
    coupons
        .create(CreateCouponInput {
            code: "FESTIVE20".to_string(),
            discount: price("100"),
            discount_type: DiscountType::Percentage,
            scope: CouponScope::Product,
            products: vec![kurta.id],
            min_purchase_amount: None,
            is_active: true,
            max_usage: None,
            offer_discount: Some(price("20")),
        })
        .await?;

    coupons
        .create(CreateCouponInput {
            code: "FLAT200".to_string(),
            discount: price("200"),
            discount_type: DiscountType::Fixed,
            scope: CouponScope::MinPurchase,
            products: vec![],
            min_purchase_amount: Some(price("1500")),
            is_active: true,
            max_usage: Some(500),
            offer_discount: None,
        })
        .await?;

    tracing::info!(
        kurta = %kurta.id,
        juttis = %juttis.id,
        "Seed complete!"
    );
    Ok(())
}
