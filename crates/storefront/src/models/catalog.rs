//! Catalog records referenced by cart items.

use rust_decimal::Decimal;

use bazaar_core::{ColorVariantId, ProductId, SizeVariantId};

/// A product with its base price.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
}

/// A size option; `price` overrides the product price when set.
#[derive(Debug, Clone)]
pub struct SizeVariant {
    pub id: SizeVariantId,
    pub size_name: String,
    pub price: Option<Decimal>,
}

/// A color option; `price` overrides the product price when set.
#[derive(Debug, Clone)]
pub struct ColorVariant {
    pub id: ColorVariantId,
    pub color_name: String,
    pub price: Option<Decimal>,
}
