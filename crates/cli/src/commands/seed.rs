//! Seed the catalog and coupons from a YAML file.
//!
//! Every record is upserted by its natural key (product slug, variant name,
//! coupon code), so running the same file twice changes nothing.
//!
//! ```yaml
//! products:
//!   - { name: "Cotton T-Shirt", slug: cotton-t-shirt, price: "40.00" }
//! sizes:
//!   - { name: M }
//!   - { name: XL, price: "45.00" }
//! colors:
//!   - { name: Red }
//! coupons:
//!   - { code: TEN, minimum_amount: "50.00", discount_kind: flat, discount_value: "10.00" }
//! ```

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use bazaar_core::DiscountKind;
use bazaar_core::cart::{CouponTerms, DiscountRule};
use bazaar_storefront::db::{self, CatalogRepository, CouponRepository};

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub products: Vec<ProductSeed>,
    #[serde(default)]
    pub sizes: Vec<VariantSeed>,
    #[serde(default)]
    pub colors: Vec<VariantSeed>,
    #[serde(default)]
    pub coupons: Vec<CouponSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    pub slug: String,
    pub price: Decimal,
}

/// A size or color option; `price` overrides the product price.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSeed {
    pub name: String,
    #[serde(default)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CouponSeed {
    pub code: String,
    pub minimum_amount: Decimal,
    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,
    #[serde(default)]
    pub is_expired: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponSeed {
    fn terms(&self) -> CouponTerms {
        CouponTerms {
            minimum_amount: self.minimum_amount,
            is_expired: self.is_expired,
            expires_at: self.expires_at,
            rule: DiscountRule {
                kind: self.discount_kind,
                value: self.discount_value,
            },
        }
    }
}

/// Problems that would make the seed misbehave, one message each.
#[must_use]
pub fn validate(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    let mut slugs = HashSet::new();
    for product in &seed.products {
        if product.name.trim().is_empty() {
            errors.push(format!("product '{}': name is empty", product.slug));
        }
        if product.slug.trim().is_empty() {
            errors.push(format!("product '{}': slug is empty", product.name));
        } else if !slugs.insert(product.slug.as_str()) {
            errors.push(format!("product '{}': duplicate slug", product.slug));
        }
        if product.price < Decimal::ZERO {
            errors.push(format!("product '{}': negative price", product.slug));
        }
    }

    for (label, variants) in [("size", &seed.sizes), ("color", &seed.colors)] {
        let mut names = HashSet::new();
        for variant in variants {
            if variant.name.trim().is_empty() {
                errors.push(format!("{label}: name is empty"));
            } else if !names.insert(variant.name.as_str()) {
                errors.push(format!("{label} '{}': duplicate name", variant.name));
            }
            if variant.price.is_some_and(|p| p < Decimal::ZERO) {
                errors.push(format!("{label} '{}': negative price", variant.name));
            }
        }
    }

    let mut codes = HashSet::new();
    for coupon in &seed.coupons {
        if coupon.code.trim().is_empty() {
            errors.push("coupon: code is empty".to_string());
        } else if !codes.insert(coupon.code.as_str()) {
            errors.push(format!("coupon '{}': duplicate code", coupon.code));
        }
        if coupon.minimum_amount < Decimal::ZERO {
            errors.push(format!("coupon '{}': negative minimum amount", coupon.code));
        }
        if coupon.discount_value <= Decimal::ZERO {
            errors.push(format!("coupon '{}': discount must be positive", coupon.code));
        }
        if coupon.discount_kind == DiscountKind::Percentage
            && coupon.discount_value > Decimal::ONE_HUNDRED
        {
            errors.push(format!("coupon '{}': percentage above 100", coupon.code));
        }
    }

    errors
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, if the
/// database URL is missing, or if a database operation fails.
pub async fn catalog(file_path: &str, check_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog seed");

    // Parse and validate before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    info!(
        products = seed.products.len(),
        sizes = seed.sizes.len(),
        colors = seed.colors.len(),
        coupons = seed.coupons.len(),
        "Seed file is valid"
    );

    if check_only {
        return Ok(());
    }

    let database_url = super::database_url().ok_or("STOREFRONT_DATABASE_URL not set")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let catalog = CatalogRepository::new(&pool);
    for product in &seed.products {
        let stored = catalog
            .upsert_product(product.name.trim(), product.slug.trim(), product.price)
            .await?;
        info!(product_id = %stored.id, slug = %stored.slug, "Product upserted");
    }
    for size in &seed.sizes {
        catalog.upsert_size_variant(size.name.trim(), size.price).await?;
    }
    for color in &seed.colors {
        catalog
            .upsert_color_variant(color.name.trim(), color.price)
            .await?;
    }

    let coupons = CouponRepository::new(&pool);
    for coupon in &seed.coupons {
        let stored = coupons.upsert(coupon.code.trim(), &coupon.terms()).await?;
        info!(coupon_id = %stored.id, code = %stored.code, "Coupon upserted");
    }

    info!("Seeding complete!");
    Ok(())
}
