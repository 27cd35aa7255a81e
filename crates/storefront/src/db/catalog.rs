//! Catalog repository: products and variants.
//!
//! The storefront only reads these tables; the CLI seeds them through the
//! `upsert_*` functions.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{ColorVariantId, ProductId, SizeVariantId};

use super::RepositoryError;
use crate::models::catalog::{ColorVariant, Product, SizeVariant};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    price: Decimal,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            price: row.price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SizeVariantRow {
    id: i32,
    size_name: String,
    price: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct ColorVariantRow {
    id: i32,
    color_name: String,
    price: Option<Decimal>,
}

impl From<SizeVariantRow> for SizeVariant {
    fn from(row: SizeVariantRow) -> Self {
        Self {
            id: SizeVariantId::new(row.id),
            size_name: row.size_name,
            price: row.price,
        }
    }
}

impl From<ColorVariantRow> for ColorVariant {
    fn from(row: ColorVariantRow) -> Self {
        Self {
            id: ColorVariantId::new(row.id),
            color_name: row.color_name,
            price: row.price,
        }
    }
}

/// Repository for catalog lookups.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, slug, price FROM storefront.product ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, slug, price FROM storefront.product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get a size variant by its name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn size_variant_by_name(
        &self,
        size_name: &str,
    ) -> Result<Option<SizeVariant>, RepositoryError> {
        let row = sqlx::query_as::<_, SizeVariantRow>(
            "SELECT id, size_name, price FROM storefront.size_variant WHERE size_name = $1",
        )
        .bind(size_name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(SizeVariant::from))
    }

    /// Get a color variant by its name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn color_variant_by_name(
        &self,
        color_name: &str,
    ) -> Result<Option<ColorVariant>, RepositoryError> {
        let row = sqlx::query_as::<_, ColorVariantRow>(
            "SELECT id, color_name, price FROM storefront.color_variant WHERE color_name = $1",
        )
        .bind(color_name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ColorVariant::from))
    }

    /// All size variants, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_size_variants(&self) -> Result<Vec<SizeVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, SizeVariantRow>(
            "SELECT id, size_name, price FROM storefront.size_variant ORDER BY size_name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(SizeVariant::from).collect())
    }

    /// All color variants, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_color_variants(&self) -> Result<Vec<ColorVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, ColorVariantRow>(
            "SELECT id, color_name, price FROM storefront.color_variant ORDER BY color_name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ColorVariant::from).collect())
    }

    /// Insert or update a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product(
        &self,
        name: &str,
        slug: &str,
        price: Decimal,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO storefront.product (name, slug, price)
             VALUES ($1, $2, $3)
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, price = EXCLUDED.price
             RETURNING id, name, slug, price",
        )
        .bind(name)
        .bind(slug)
        .bind(price)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Insert or update a size variant by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_size_variant(
        &self,
        size_name: &str,
        price: Option<Decimal>,
    ) -> Result<SizeVariantId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO storefront.size_variant (size_name, price)
             VALUES ($1, $2)
             ON CONFLICT (size_name) DO UPDATE SET price = EXCLUDED.price
             RETURNING id",
        )
        .bind(size_name)
        .bind(price)
        .fetch_one(self.pool)
        .await?;

        Ok(SizeVariantId::new(id))
    }

    /// Insert or update a color variant by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_color_variant(
        &self,
        color_name: &str,
        price: Option<Decimal>,
    ) -> Result<ColorVariantId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO storefront.color_variant (color_name, price)
             VALUES ($1, $2)
             ON CONFLICT (color_name) DO UPDATE SET price = EXCLUDED.price
             RETURNING id",
        )
        .bind(color_name)
        .bind(price)
        .fetch_one(self.pool)
        .await?;

        Ok(ColorVariantId::new(id))
    }
}
