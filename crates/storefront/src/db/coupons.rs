//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::cart::{CouponTerms, DiscountRule};
use bazaar_core::{CouponId, DiscountKind};

use super::RepositoryError;
use crate::models::cart::Coupon;

pub(crate) const COUPON_COLUMNS: &str =
    "id, coupon_code, minimum_amount, discount_kind, discount_value, is_expired, expires_at";

#[derive(sqlx::FromRow)]
pub(crate) struct CouponRow {
    id: i32,
    coupon_code: String,
    minimum_amount: Decimal,
    discount_kind: DiscountKind,
    discount_value: Decimal,
    is_expired: bool,
    expires_at: Option<DateTime<Utc>>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: CouponId::new(row.id),
            code: row.coupon_code,
            terms: CouponTerms {
                minimum_amount: row.minimum_amount,
                is_expired: row.is_expired,
                expires_at: row.expires_at,
                rule: DiscountRule {
                    kind: row.discount_kind,
                    value: row.discount_value,
                },
            },
        }
    }
}

/// Repository for coupons.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look a coupon up by exact code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM storefront.coupon WHERE coupon_code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM storefront.coupon WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Insert or update a coupon by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, code: &str, terms: &CouponTerms) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "INSERT INTO storefront.coupon
                (coupon_code, minimum_amount, discount_kind, discount_value, is_expired, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (coupon_code) DO UPDATE SET
                minimum_amount = EXCLUDED.minimum_amount,
                discount_kind = EXCLUDED.discount_kind,
                discount_value = EXCLUDED.discount_value,
                is_expired = EXCLUDED.is_expired,
                expires_at = EXCLUDED.expires_at
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(code)
        .bind(terms.minimum_amount)
        .bind(terms.rule.kind)
        .bind(terms.rule.value)
        .bind(terms.is_expired)
        .bind(terms.expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
