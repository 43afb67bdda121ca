//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use marigold_core::{CouponId, ProductId};

use super::RepositoryError;
use crate::models::Coupon;
use crate::models::coupon::{CouponFilter, CreateCouponInput, UpdateCouponInput};

/// Internal row type for coupon queries.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    discount: Decimal,
    discount_type: String,
    scope: String,
    products: Vec<Uuid>,
    min_purchase_amount: Option<Decimal>,
    is_active: bool,
    usage_count: i32,
    max_usage: Option<i32>,
    offer_discount: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let discount_type = row
            .discount_type
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("coupon {}: {e}", row.code)))?;
        let scope = row
            .scope
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("coupon {}: {e}", row.code)))?;

        Ok(Self {
            id: CouponId::new(row.id),
            code: row.code,
            discount: row.discount,
            discount_type,
            scope,
            products: row.products.into_iter().map(ProductId::new).collect(),
            min_purchase_amount: row.min_purchase_amount,
            is_active: row.is_active,
            usage_count: row.usage_count,
            max_usage: row.max_usage,
            offer_discount: row.offer_discount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COUPON: &str = "SELECT id, code, discount, discount_type, scope, products, \
     min_purchase_amount, is_active, usage_count, max_usage, offer_discount, \
     created_at, updated_at FROM coupons";

fn product_uuids(ids: &[ProductId]) -> Vec<Uuid> {
    ids.iter().map(ProductId::as_uuid).collect()
}

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new coupon. The code must already be validated and
    /// uppercased by the service layer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate code and
    /// `RepositoryError::Database` for other failures.
    pub async fn create(&self, input: &CreateCouponInput) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            "INSERT INTO coupons \
                 (code, discount, discount_type, scope, products, min_purchase_amount, \
                  is_active, max_usage, offer_discount) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, code, discount, discount_type, scope, products, \
                       min_purchase_amount, is_active, usage_count, max_usage, offer_discount, \
                       created_at, updated_at",
        )
        .bind(&input.code)
        .bind(input.discount)
        .bind(input.discount_type.as_str())
        .bind(input.scope.as_str())
        .bind(product_uuids(&input.products))
        .bind(input.min_purchase_amount)
        .bind(input.is_active)
        .bind(input.max_usage)
        .bind(input.offer_discount)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("coupon code already taken: {}", input.code))
            }
            _ => RepositoryError::Database(e),
        })?;

        row.try_into()
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!("{SELECT_COUPON} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Get a coupon by its (uppercase) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!("{SELECT_COUPON} WHERE code = $1"))
            .bind(code)
            .fetch_optional(self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// List coupons matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &CouponFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Coupon>, RepositoryError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COUPON);
        builder.push(" WHERE TRUE");
        if let Some(code) = &filter.code {
            builder.push(" AND code = ").push_bind(code.to_uppercase());
        }
        if let Some(discount_type) = filter.discount_type {
            builder
                .push(" AND discount_type = ")
                .push_bind(discount_type.as_str());
        }
        if let Some(scope) = filter.scope {
            builder.push(" AND scope = ").push_bind(scope.as_str());
        }
        if let Some(is_active) = filter.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        builder.push(" ORDER BY created_at DESC");
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let rows = builder
            .build_query_as::<CouponRow>()
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Apply a partial update to a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist,
    /// `RepositoryError::Conflict` on a duplicate code.
    pub async fn update(
        &self,
        id: CouponId,
        input: &UpdateCouponInput,
    ) -> Result<Coupon, RepositoryError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE coupons SET ");
        let mut set = builder.separated(", ");
        if let Some(code) = &input.code {
            set.push("code = ").push_bind_unseparated(code);
        }
        if let Some(discount) = input.discount {
            set.push("discount = ").push_bind_unseparated(discount);
        }
        if let Some(discount_type) = input.discount_type {
            set.push("discount_type = ")
                .push_bind_unseparated(discount_type.as_str());
        }
        if let Some(scope) = input.scope {
            set.push("scope = ").push_bind_unseparated(scope.as_str());
        }
        if let Some(products) = &input.products {
            set.push("products = ")
                .push_bind_unseparated(product_uuids(products));
        }
        if let Some(amount) = input.min_purchase_amount {
            set.push("min_purchase_amount = ").push_bind_unseparated(amount);
        }
        if let Some(is_active) = input.is_active {
            set.push("is_active = ").push_bind_unseparated(is_active);
        }
        if let Some(max_usage) = input.max_usage {
            set.push("max_usage = ").push_bind_unseparated(max_usage);
        }
        if let Some(offer_discount) = input.offer_discount {
            set.push("offer_discount = ")
                .push_bind_unseparated(offer_discount);
        }
        set.push("updated_at = now()");
        builder.push(" WHERE id = ").push_bind(id.as_uuid());
        builder.push(
            " RETURNING id, code, discount, discount_type, scope, products, \
              min_purchase_amount, is_active, usage_count, max_usage, offer_discount, \
              created_at, updated_at",
        );

        let row = builder
            .build_query_as::<CouponRow>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Conflict("coupon code already taken".to_string())
                }
                _ => RepositoryError::Database(e),
            })?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a coupon; returns `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: CouponId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Whether a code is already taken by another coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_code_taken(
        &self,
        code: &str,
        exclude: Option<CouponId>,
    ) -> Result<bool, RepositoryError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM coupons WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude.map(|id| id.as_uuid()))
        .fetch_one(self.pool)
        .await?;

        Ok(taken)
    }

    /// Active coupons whose scope covers the given product: min-purchase
    /// coupons, global product coupons, and coupons targeting the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "{SELECT_COUPON} \
             WHERE is_active \
               AND (scope = 'min_purchase' \
                    OR cardinality(products) = 0 \
                    OR $1 = ANY(products)) \
             ORDER BY created_at, id"
        ))
        .bind(product_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Candidate coupons for the pricing pipeline: active, not exhausted,
    /// and covering at least one of the given products (or global, or
    /// min-purchase scoped). Ordered by creation so "first eligible" is
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn candidates_for_products(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<Coupon>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "{SELECT_COUPON} \
             WHERE is_active \
               AND (max_usage IS NULL OR usage_count < max_usage) \
               AND (scope = 'min_purchase' \
                    OR cardinality(products) = 0 \
                    OR products && $1) \
             ORDER BY created_at, id"
        ))
        .bind(product_uuids(product_ids))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// The highest-value active coupon targeting any of the given products
    /// whose flat discount fits inside the amount.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn best_for_products(
        &self,
        product_ids: &[ProductId],
        amount: Decimal,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "{SELECT_COUPON} \
             WHERE is_active AND products && $1 AND discount <= $2 \
             ORDER BY discount DESC, created_at \
             LIMIT 1"
        ))
        .bind(product_uuids(product_ids))
        .bind(amount)
        .fetch_optional(self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Increment a coupon's usage count, guarded by its redemption cap.
    ///
    /// Returns `false` when the coupon is missing, inactive, or exhausted.
    /// Runs on the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn increment_usage(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE coupons \
             SET usage_count = usage_count + 1, updated_at = now() \
             WHERE code = $1 AND is_active \
               AND (max_usage IS NULL OR usage_count < max_usage)",
        )
        .bind(code)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
