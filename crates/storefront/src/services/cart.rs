//! Cart service: items, quantities and coupons on the user's open cart.
//!
//! All lookups happen before anything is written; the repository then does
//! get-or-create of the cart plus the insert in one transaction.

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, instrument};

use bazaar_core::cart::{CouponRejection, validate_coupon};
use bazaar_core::{CartId, CartItemId, ProductId};

use crate::db::carts::NewCartItem;
use crate::db::{CartRepository, CatalogRepository, CouponRepository, RepositoryError};
use crate::models::{Cart, Coupon, CurrentUser, PricedCart};

/// Errors from cart operations. `Display` is user-facing.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Size variant not found")]
    SizeVariantNotFound,

    #[error("Color variant not found")]
    ColorVariantNotFound,

    /// The item is not in the user's open cart.
    #[error("Cart item not found")]
    ItemNotFound,

    /// The user has no open cart, or the ID is not theirs.
    #[error("Cart not found")]
    CartNotFound,

    #[error("Quantity must be a positive whole number")]
    InvalidQuantity,

    #[error("{0}")]
    Coupon(#[from] CouponRejection),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A quantity as posted by the cart page: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(serde_json::Number),
    Text(String),
}

impl QuantityInput {
    /// The quantity as a positive integer.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for zero, negatives, fractions
    /// and non-numeric text.
    pub fn to_quantity(&self) -> Result<u32, CartError> {
        let quantity = match self {
            Self::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Self::Text(s) => s.trim().parse::<u32>().ok(),
        };

        quantity
            .filter(|&q| q > 0)
            .ok_or(CartError::InvalidQuantity)
    }
}

/// Cart operations for the signed-in user.
pub struct CartService<'a> {
    pool: &'a PgPool,
    carts: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            carts: CartRepository::new(pool),
        }
    }

    /// The user's open cart, priced, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if loading fails.
    pub async fn open_cart(&self, user: &CurrentUser) -> Result<Option<PricedCart>, CartError> {
        let Some(cart) = self.carts.open_cart(user.id).await? else {
            return Ok(None);
        };

        Ok(Some(price_cart(self.pool, cart).await?))
    }

    /// Add a product, with optional size and color by name.
    ///
    /// Empty variant names count as absent.
    ///
    /// # Errors
    ///
    /// Returns a `*NotFound` error if the product or a named variant does not
    /// exist; the cart is left unchanged.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn add_item(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Result<CartItemId, CartError> {
        let catalog = CatalogRepository::new(self.pool);

        let product = catalog
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let size_variant_id = match non_empty(size) {
            Some(name) => Some(
                catalog
                    .size_variant_by_name(name)
                    .await?
                    .ok_or(CartError::SizeVariantNotFound)?
                    .id,
            ),
            None => None,
        };

        let color_variant_id = match non_empty(color) {
            Some(name) => Some(
                catalog
                    .color_variant_by_name(name)
                    .await?
                    .ok_or(CartError::ColorVariantNotFound)?
                    .id,
            ),
            None => None,
        };

        let (cart_id, item_id) = self
            .carts
            .add_item(
                user.id,
                NewCartItem {
                    product_id: product.id,
                    size_variant_id,
                    color_variant_id,
                    quantity: 1,
                },
            )
            .await?;

        info!(cart_id = %cart_id, item_id = %item_id, "Item added to cart");
        Ok(item_id)
    }

    /// Set an item's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a non-positive quantity and
    /// `CartError::ItemNotFound` if the item is not in the user's open cart.
    #[instrument(skip(self, user, quantity), fields(user_id = %user.id))]
    pub async fn update_item_quantity(
        &self,
        user: &CurrentUser,
        item_id: CartItemId,
        quantity: &QuantityInput,
    ) -> Result<u32, CartError> {
        let quantity = quantity.to_quantity()?;

        if !self
            .carts
            .update_quantity(user.id, item_id, quantity)
            .await?
        {
            return Err(CartError::ItemNotFound);
        }

        debug!(quantity, "Quantity updated");
        Ok(quantity)
    }

    /// Remove an item from the user's open cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if it is not there.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn remove_item(&self, user: &CurrentUser, item_id: CartItemId) -> Result<(), CartError> {
        if !self.carts.remove_item(user.id, item_id).await? {
            return Err(CartError::ItemNotFound);
        }
        Ok(())
    }

    /// Validate `code` against the open cart and attach it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` without an open cart, otherwise a
    /// `CartError::Coupon` rejection in validation order.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn apply_coupon(&self, user: &CurrentUser, code: &str) -> Result<Coupon, CartError> {
        let cart = self
            .open_cart(user)
            .await?
            .ok_or(CartError::CartNotFound)?;

        let coupon = CouponRepository::new(self.pool)
            .get_by_code(code.trim())
            .await?
            .ok_or(CouponRejection::UnknownCode)?;

        validate_coupon(
            &coupon.terms,
            cart.cart.coupon_id.is_some(),
            cart.totals.subtotal,
            Utc::now(),
        )?;

        // Conditional on `coupon_id IS NULL`: a concurrent apply that won
        // shows up here as "already applied".
        if !self.carts.attach_coupon(cart.cart.id, coupon.id).await? {
            return Err(CouponRejection::AlreadyApplied.into());
        }

        info!(cart_id = %cart.cart.id, coupon = %coupon.code, "Coupon applied");
        Ok(coupon)
    }

    /// The user's paid carts, newest first, priced for the order history.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if loading fails.
    pub async fn paid_orders(&self, user: &CurrentUser) -> Result<Vec<PricedCart>, CartError> {
        let mut orders = Vec::new();
        for cart in self.carts.paid_carts(user.id).await? {
            orders.push(price_cart(self.pool, cart).await?);
        }
        Ok(orders)
    }

    /// Detach the coupon from the user's open cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if `cart_id` is not the user's open
    /// cart.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn remove_coupon(&self, user: &CurrentUser, cart_id: CartId) -> Result<(), CartError> {
        if !self.carts.detach_coupon(user.id, cart_id).await? {
            return Err(CartError::CartNotFound);
        }
        Ok(())
    }
}

/// Load lines and coupon for `cart` and compute its totals.
pub(crate) async fn price_cart(pool: &PgPool, cart: Cart) -> Result<PricedCart, RepositoryError> {
    let lines = CartRepository::new(pool).lines(cart.id).await?;

    let coupon = match cart.coupon_id {
        Some(id) => CouponRepository::new(pool).get_by_id(id).await?,
        None => None,
    };

    Ok(PricedCart::new(cart, lines, coupon))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> QuantityInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_quantity_accepts_number_and_string() {
        assert_eq!(parse("3").to_quantity().unwrap(), 3);
        assert_eq!(parse("\"4\"").to_quantity().unwrap(), 4);
        assert_eq!(parse("\" 2 \"").to_quantity().unwrap(), 2);
    }

    #[test]
    fn test_quantity_rejects_non_positive() {
        for json in ["0", "-1", "\"0\"", "\"-3\"", "2.5", "\"two\"", "\"\""] {
            assert!(
                matches!(parse(json).to_quantity(), Err(CartError::InvalidQuantity)),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn test_quantity_rejects_overflow() {
        assert!(parse("4294967296").to_quantity().is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(" M ")), Some("M"));
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_coupon_rejection_message_passes_through() {
        let err = CartError::from(CouponRejection::AlreadyApplied);
        assert_eq!(err.to_string(), "Coupon already exists.");
    }
}
