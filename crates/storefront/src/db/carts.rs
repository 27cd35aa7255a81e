//! Cart repository.
//!
//! Every mutation is scoped to the owning user and, where it matters, to the
//! user's open cart. Concurrency is left to `PostgreSQL`:
//!
//! - `cart_one_open_per_user_idx` + `ON CONFLICT DO NOTHING` for get-or-create
//! - conditional updates for coupon attach, provider order id and payment
//!
//! Any change to items or coupon drops the cart's provider order, so an
//! order can only be paid for the contents it was created for.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::cart::unit_price;
use bazaar_core::{CartId, CartItemId, ColorVariantId, CouponId, ProductId, SizeVariantId, UserId};

use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::cart::{Cart, CartLine};

const CART_COLUMNS: &str = "id, user_id, coupon_id, is_paid, razorpay_order_id, \
     checkout_amount_paise, razorpay_payment_id, paid_at, created_at";

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    coupon_id: Option<i32>,
    is_paid: bool,
    razorpay_order_id: Option<String>,
    checkout_amount_paise: Option<i64>,
    razorpay_payment_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            coupon_id: row.coupon_id.map(CouponId::new),
            is_paid: row.is_paid,
            razorpay_order_id: row.razorpay_order_id,
            checkout_amount_paise: row.checkout_amount_paise,
            razorpay_payment_id: row.razorpay_payment_id,
            paid_at: row.paid_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: i32,
    product_id: i32,
    product_name: String,
    product_price: Decimal,
    size_name: Option<String>,
    size_price: Option<Decimal>,
    color_name: Option<String>,
    color_price: Option<Decimal>,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_id: CartItemId::new(row.item_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            unit_price: unit_price(row.product_price, row.size_price, row.color_price),
            size_name: row.size_name,
            color_name: row.color_name,
            quantity: quantity_from_db(row.quantity)?,
        })
    }
}

/// A fully-resolved item to insert.
#[derive(Debug, Clone, Copy)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub size_variant_id: Option<SizeVariantId>,
    pub color_variant_id: Option<ColorVariantId>,
    pub quantity: u32,
}

/// Outcome of storing a provider order id.
#[derive(Debug, Clone)]
pub enum OrderIdUpdate {
    /// Our order id is now on the cart.
    Stored,
    /// Another request changed the cart first; this is what it holds now.
    Lost(Option<Cart>),
}

/// Repository for carts and cart items.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's unpaid cart, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn open_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE user_id = $1 AND NOT is_paid"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    /// Look a cart up by provider order id, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_order_id(
        &self,
        user_id: UserId,
        order_id: &str,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart
             WHERE user_id = $1 AND razorpay_order_id = $2"
        ))
        .bind(user_id)
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    /// The user's paid carts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn paid_carts(&self, user_id: UserId) -> Result<Vec<Cart>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart
             WHERE user_id = $1 AND is_paid
             ORDER BY paid_at DESC NULLS LAST, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Cart::from).collect())
    }

    /// Items of a cart with product and variant data, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` for a non-positive quantity.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            "SELECT ci.id AS item_id, p.id AS product_id, p.name AS product_name,
                    p.price AS product_price,
                    sv.size_name, sv.price AS size_price,
                    cv.color_name, cv.price AS color_price,
                    ci.quantity
             FROM storefront.cart_item ci
             JOIN storefront.product p ON p.id = ci.product_id
             LEFT JOIN storefront.size_variant sv ON sv.id = ci.size_variant_id
             LEFT JOIN storefront.color_variant cv ON cv.id = ci.color_variant_id
             WHERE ci.cart_id = $1
             ORDER BY ci.id",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Add an item to the user's open cart, creating the cart if needed.
    ///
    /// Get-or-create and the insert run in one transaction, so a failure
    /// leaves no half-built cart behind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn add_item(
        &self,
        user_id: UserId,
        item: NewCartItem,
    ) -> Result<(CartId, CartItemId), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cart_id = get_or_create_open_cart(&mut tx, user_id).await?;

        let quantity = quantity_to_db(item.quantity)?;

        let item_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO storefront.cart_item
                (cart_id, product_id, size_variant_id, color_variant_id, quantity)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(cart_id)
        .bind(item.product_id)
        .bind(item.size_variant_id)
        .bind(item.color_variant_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        drop_provider_order(&mut tx, cart_id).await?;

        tx.commit().await?;

        Ok((cart_id, CartItemId::new(item_id)))
    }

    /// Set the quantity of an item in the user's open cart.
    ///
    /// Returns `false` if the item is not in that cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let quantity = quantity_to_db(quantity)?;
        let mut tx = self.pool.begin().await?;

        let cart_id = sqlx::query_scalar::<_, i32>(
            "UPDATE storefront.cart_item ci SET quantity = $3
             FROM storefront.cart c
             WHERE ci.id = $2 AND ci.cart_id = c.id
               AND c.user_id = $1 AND NOT c.is_paid
             RETURNING c.id",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(cart_id) = cart_id else {
            return Ok(false);
        };
        drop_provider_order(&mut tx, CartId::new(cart_id)).await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Delete an item from the user's open cart.
    ///
    /// Returns `false` if the item is not in that cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cart_id = sqlx::query_scalar::<_, i32>(
            "DELETE FROM storefront.cart_item ci
             USING storefront.cart c
             WHERE ci.id = $2 AND ci.cart_id = c.id
               AND c.user_id = $1 AND NOT c.is_paid
             RETURNING c.id",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(cart_id) = cart_id else {
            return Ok(false);
        };
        drop_provider_order(&mut tx, CartId::new(cart_id)).await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Attach a coupon if the open cart has none.
    ///
    /// Returns `false` if the cart already carries a coupon (or was paid).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn attach_coupon(
        &self,
        cart_id: CartId,
        coupon_id: CouponId,
    ) -> Result<bool, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE storefront.cart
             SET coupon_id = $2, razorpay_order_id = NULL, checkout_amount_paise = NULL,
                 updated_at = now()
             WHERE id = $1 AND coupon_id IS NULL AND NOT is_paid",
        )
        .bind(cart_id)
        .bind(coupon_id)
        .execute(self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Detach the coupon from the user's open cart.
    ///
    /// Returns `false` if `cart_id` is not the user's open cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn detach_coupon(
        &self,
        user_id: UserId,
        cart_id: CartId,
    ) -> Result<bool, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE storefront.cart
             SET coupon_id = NULL, razorpay_order_id = NULL, checkout_amount_paise = NULL,
                 updated_at = now()
             WHERE id = $1 AND user_id = $2 AND NOT is_paid",
        )
        .bind(cart_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Record a provider order on an unpaid cart.
    ///
    /// Compare-and-set on the order id observed when pricing started
    /// (`expected_order_id`); a concurrent checkout that stored its own
    /// order first makes this return [`OrderIdUpdate::Lost`] with the
    /// cart as it is now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order id is already used by
    /// another cart.
    pub async fn set_provider_order(
        &self,
        cart_id: CartId,
        expected_order_id: Option<&str>,
        order_id: &str,
        amount_paise: i64,
    ) -> Result<OrderIdUpdate, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE storefront.cart
             SET razorpay_order_id = $3, checkout_amount_paise = $4, updated_at = now()
             WHERE id = $1 AND NOT is_paid
               AND razorpay_order_id IS NOT DISTINCT FROM $2",
        )
        .bind(cart_id)
        .bind(expected_order_id)
        .bind(order_id)
        .bind(amount_paise)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "provider order"))?;

        if updated.rows_affected() > 0 {
            return Ok(OrderIdUpdate::Stored);
        }

        let current = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE id = $1"
        ))
        .bind(cart_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(OrderIdUpdate::Lost(current.map(Cart::from)))
    }

    /// Mark the cart paid for `order_id`. Only the first call transitions,
    /// and only while the cart still carries that order.
    ///
    /// Returns `true` if this call performed the transition.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_paid(
        &self,
        cart_id: CartId,
        order_id: &str,
        payment_id: &str,
    ) -> Result<bool, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE storefront.cart
             SET is_paid = TRUE, razorpay_payment_id = $3, paid_at = now(), updated_at = now()
             WHERE id = $1 AND razorpay_order_id = $2 AND NOT is_paid",
        )
        .bind(cart_id)
        .bind(order_id)
        .bind(payment_id)
        .execute(self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }
}

/// Return the user's open cart ID, inserting a cart if there is none.
async fn get_or_create_open_cart(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<CartId, RepositoryError> {
    sqlx::query(
        "INSERT INTO storefront.cart (user_id) VALUES ($1)
         ON CONFLICT (user_id) WHERE NOT is_paid DO NOTHING",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    let id = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM storefront.cart WHERE user_id = $1 AND NOT is_paid",
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(CartId::new(id))
}

/// Forget the provider order after the cart's contents changed.
async fn drop_provider_order(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: CartId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE storefront.cart
         SET razorpay_order_id = NULL, checkout_amount_paise = NULL, updated_at = now()
         WHERE id = $1 AND NOT is_paid",
    )
    .bind(cart_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
