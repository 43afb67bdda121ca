//! Product catalog domain types.
//!
//! The pricing pipeline treats the catalog as read-only: it needs a
//! product's prices, stock level, category, and image sets, nothing more.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marigold_core::{ProductId, effective_price};

/// A catalog product (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Long-form description.
    pub description: Option<String>,
    /// List price in whole currency units.
    pub price: Decimal,
    /// Discounted price, when the product is on sale.
    pub sale_price: Option<Decimal>,
    /// Units currently in stock.
    pub stock_quantity: i32,
    /// Category slug.
    pub category: Option<String>,
    /// Product image URLs.
    pub images: Vec<String>,
    /// Image URLs keyed by colorway name.
    pub color_images: HashMap<String, Vec<String>>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The unit price this product is charged at (sale price when on sale).
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price, self.sale_price)
    }

    /// Whether the requested quantity can currently be fulfilled.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: i32) -> bool {
        self.stock_quantity >= quantity
    }

    /// The image shown for a given colorway, falling back to the first
    /// product image.
    #[must_use]
    pub fn image_for_color(&self, color: Option<&str>) -> Option<String> {
        color
            .and_then(|c| self.color_images.get(c))
            .and_then(|imgs| imgs.first())
            .or_else(|| self.images.first())
            .cloned()
    }
}

/// Input for creating a product (used by seeding and admin tooling).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub color_images: HashMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: &str, sale: Option<&str>) -> Product {
        Product {
            id: ProductId::generate(),
            title: "Linen Kurta".to_string(),
            description: None,
            price: price.parse().expect("price"),
            sale_price: sale.map(|s| s.parse().expect("sale price")),
            stock_quantity: 5,
            category: Some("apparel".to_string()),
            images: vec!["https://img.example/kurta.jpg".to_string()],
            color_images: HashMap::from([(
                "Indigo".to_string(),
                vec!["https://img.example/kurta-indigo.jpg".to_string()],
            )]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn effective_price_prefers_sale() {
        assert_eq!(
            product("1000", Some("800")).effective_price(),
            "800".parse().expect("decimal")
        );
        assert_eq!(
            product("1000", None).effective_price(),
            "1000".parse().expect("decimal")
        );
    }

    #[test]
    fn stock_check_is_inclusive() {
        let p = product("1000", None);
        assert!(p.has_stock_for(5));
        assert!(!p.has_stock_for(6));
    }

    #[test]
    fn colorway_image_falls_back_to_first() {
        let p = product("1000", None);
        assert_eq!(
            p.image_for_color(Some("Indigo")).as_deref(),
            Some("https://img.example/kurta-indigo.jpg")
        );
        assert_eq!(
            p.image_for_color(Some("Crimson")).as_deref(),
            Some("https://img.example/kurta.jpg")
        );
    }
}
