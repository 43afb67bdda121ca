//! Cart mutation and read service.
//!
//! Every operation returns the freshly priced cart, so clients always see
//! totals consistent with the mutation they just made.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use marigold_core::{ProductId, UserId, Variant};

use crate::db::cart::UpsertLine;
use crate::db::{CartRepository, CouponRepository, ProductRepository, RepositoryError};
use crate::models::CartLine;
use crate::models::cart::{AddLineInput, RemoveLineInput, UpdateLineInput};
use crate::pricing::{self, PricedCart};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The referenced product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// Requested quantity exceeds current stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    /// The user has no cart lines.
    #[error("cart not found")]
    CartNotFound,

    /// No cart line matches the given key.
    #[error("cart line not found")]
    LineNotFound,

    /// Multiple lines match and no disambiguating key was given.
    #[error("multiple cart lines match; specify the product (and variant)")]
    AmbiguousTarget,

    /// Quantity is negative or out of range.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Service for cart reads and mutations.
pub struct CartService<'a> {
    pool: &'a PgPool,
    tax_rate: Decimal,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tax_rate: Decimal) -> Self {
        Self { pool, tax_rate }
    }

    /// The user's cart, priced through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn priced_cart(&self, user_id: UserId) -> Result<PricedCart, CartError> {
        let lines = CartRepository::new(self.pool).lines_for_user(user_id).await?;
        self.price(&lines).await
    }

    async fn price(&self, lines: &[CartLine]) -> Result<PricedCart, CartError> {
        if lines.is_empty() {
            return Ok(PricedCart::empty());
        }

        let mut seen = std::collections::HashSet::new();
        let product_ids: Vec<ProductId> = lines
            .iter()
            .map(|l| l.product_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let products = ProductRepository::new(self.pool)
            .get_many(&product_ids)
            .await?;
        let coupons = CouponRepository::new(self.pool)
            .candidates_for_products(&product_ids)
            .await?;

        Ok(pricing::price_cart(lines, &products, &coupons, self.tax_rate))
    }

    /// Add a product to the cart, or replace the quantity of the existing
    /// line for the same (product, variant) key.
    ///
    /// Quantity 0 removes the line; against a missing line it is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound`, `CartError::InsufficientStock`,
    /// or `CartError::InvalidQuantity` per the rules above.
    pub async fn add_or_update(
        &self,
        user_id: UserId,
        input: AddLineInput,
    ) -> Result<PricedCart, CartError> {
        let quantity = parse_quantity(input.quantity)?;
        let variant = input.variant();

        if quantity == 0 {
            CartRepository::new(self.pool)
                .delete_line(user_id, input.product_id, &variant)
                .await?;
            return self.priced_cart(user_id).await;
        }

        self.write_line(user_id, input.product_id, variant, quantity)
            .await?;
        self.priced_cart(user_id).await
    }

    /// Set the quantity of an existing line, identified by product/variant
    /// or implicitly when the cart holds a single line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` on an empty cart,
    /// `CartError::AmbiguousTarget` when the key does not narrow to one
    /// line, plus the stock/quantity errors of [`Self::add_or_update`].
    pub async fn update_line(
        &self,
        user_id: UserId,
        input: UpdateLineInput,
    ) -> Result<PricedCart, CartError> {
        let quantity = parse_quantity(input.quantity)?;
        let lines = CartRepository::new(self.pool).lines_for_user(user_id).await?;
        if lines.is_empty() {
            return Err(CartError::CartNotFound);
        }

        let target = resolve_target(&lines, input.product_id, input.variant().as_ref())?;
        let (product_id, variant) = (target.product_id, target.variant.clone());

        if quantity == 0 {
            CartRepository::new(self.pool)
                .delete_line(user_id, product_id, &variant)
                .await?;
            return self.priced_cart(user_id).await;
        }

        self.write_line(user_id, product_id, variant, quantity)
            .await?;
        self.priced_cart(user_id).await
    }

    /// Remove a line, identified the same way as [`Self::update_line`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound`, `CartError::LineNotFound`, or
    /// `CartError::AmbiguousTarget`.
    pub async fn remove_line(
        &self,
        user_id: UserId,
        input: RemoveLineInput,
    ) -> Result<PricedCart, CartError> {
        let repo = CartRepository::new(self.pool);
        let lines = repo.lines_for_user(user_id).await?;
        if lines.is_empty() {
            return Err(CartError::CartNotFound);
        }

        let target = resolve_target(&lines, input.product_id, input.variant().as_ref())?;
        let (product_id, variant) = (target.product_id, target.variant.clone());

        if !repo.delete_line(user_id, product_id, &variant).await? {
            return Err(CartError::LineNotFound);
        }
        self.priced_cart(user_id).await
    }

    /// Delete every line in the user's cart. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<PricedCart, CartError> {
        let removed = CartRepository::new(self.pool).clear(user_id).await?;
        tracing::debug!(%user_id, removed, "cart cleared");
        Ok(PricedCart::empty())
    }

    /// Validate stock and write the line with a fresh pricing snapshot.
    async fn write_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant: Variant,
        quantity: i32,
    ) -> Result<CartLine, CartError> {
        let product = ProductRepository::new(self.pool)
            .get(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        if !product.has_stock_for(quantity) {
            return Err(CartError::InsufficientStock {
                requested: quantity,
                available: product.stock_quantity,
            });
        }

        let unit_price = product.effective_price();
        let selected_image = product.image_for_color(variant.color.as_deref());
        let line = UpsertLine {
            user_id,
            product_id,
            product_title: product.title.clone(),
            price: product.price,
            sale_price: product.sale_price,
            quantity,
            variant,
            selected_image,
            subtotal: unit_price * Decimal::from(quantity),
        };

        Ok(CartRepository::new(self.pool).upsert_line(&line).await?)
    }
}

/// Check a requested quantity is a non-negative value that fits a line.
fn parse_quantity(quantity: i64) -> Result<i32, CartError> {
    if quantity < 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    i32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))
}

/// Narrow a user's cart lines down to the single line an update/remove
/// targets.
///
/// With no product given, the cart must hold exactly one line (or exactly
/// one line matching the given variant). With a product given, the variant
/// is only needed when several lines share that product.
fn resolve_target<'l>(
    lines: &'l [CartLine],
    product_id: Option<ProductId>,
    variant: Option<&Variant>,
) -> Result<&'l CartLine, CartError> {
    let matches: Vec<&CartLine> = lines
        .iter()
        .filter(|line| product_id.is_none_or(|pid| line.product_id == pid))
        .filter(|line| variant.is_none_or(|v| line.variant.key() == v.key()))
        .collect();

    match matches.as_slice() {
        [] => Err(if product_id.is_none() && variant.is_none() {
            CartError::CartNotFound
        } else {
            CartError::LineNotFound
        }),
        [line] => Ok(line),
        _ => Err(CartError::AmbiguousTarget),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use marigold_core::CartLineId;
    use rust_decimal::Decimal;

    use super::*;

    fn line(product_id: ProductId, color: Option<&str>, size: Option<&str>) -> CartLine {
        CartLine {
            id: CartLineId::generate(),
            user_id: UserId::generate(),
            product_id,
            product_title: "Linen Kurta".to_string(),
            price: Decimal::from(100),
            sale_price: None,
            quantity: 1,
            variant: Variant {
                color: color.map(str::to_string),
                size: size.map(str::to_string),
            },
            selected_image: None,
            subtotal: Decimal::from(100),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn single_line_resolves_without_a_key() {
        let lines = vec![line(ProductId::generate(), None, None)];
        let target = resolve_target(&lines, None, None).expect("resolves");
        assert_eq!(target.id, lines.first().expect("line").id);
    }

    #[test]
    fn multiple_lines_without_a_key_are_ambiguous() {
        let lines = vec![
            line(ProductId::generate(), None, None),
            line(ProductId::generate(), None, None),
        ];
        assert!(matches!(
            resolve_target(&lines, None, None),
            Err(CartError::AmbiguousTarget)
        ));
    }

    #[test]
    fn product_id_narrows_to_one_line() {
        let wanted = ProductId::generate();
        let lines = vec![
            line(ProductId::generate(), None, None),
            line(wanted, None, None),
        ];
        let target = resolve_target(&lines, Some(wanted), None).expect("resolves");
        assert_eq!(target.product_id, wanted);
    }

    #[test]
    fn same_product_in_two_variants_needs_the_variant() {
        let pid = ProductId::generate();
        let lines = vec![
            line(pid, Some("Indigo"), Some("M")),
            line(pid, Some("Crimson"), Some("M")),
        ];
        assert!(matches!(
            resolve_target(&lines, Some(pid), None),
            Err(CartError::AmbiguousTarget)
        ));

        let indigo = Variant {
            color: Some("Indigo".to_string()),
            size: Some("M".to_string()),
        };
        let target = resolve_target(&lines, Some(pid), Some(&indigo)).expect("resolves");
        assert_eq!(target.variant.color.as_deref(), Some("Indigo"));
    }

    #[test]
    fn unknown_product_is_line_not_found() {
        let lines = vec![line(ProductId::generate(), None, None)];
        assert!(matches!(
            resolve_target(&lines, Some(ProductId::generate()), None),
            Err(CartError::LineNotFound)
        ));
    }

    #[test]
    fn variant_alone_can_disambiguate() {
        let lines = vec![
            line(ProductId::generate(), Some("Indigo"), None),
            line(ProductId::generate(), Some("Crimson"), None),
        ];
        let crimson = Variant {
            color: Some("Crimson".to_string()),
            size: None,
        };
        let target = resolve_target(&lines, None, Some(&crimson)).expect("resolves");
        assert_eq!(target.variant.color.as_deref(), Some("Crimson"));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        assert!(matches!(
            parse_quantity(-1),
            Err(CartError::InvalidQuantity(-1))
        ));
        assert!(matches!(
            parse_quantity(i64::from(i32::MAX) + 1),
            Err(CartError::InvalidQuantity(_))
        ));
        assert_eq!(parse_quantity(0).expect("zero is valid"), 0);
        assert_eq!(parse_quantity(3).expect("three is valid"), 3);
    }
}
