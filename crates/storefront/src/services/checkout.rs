//! Checkout: turn the open cart into a Razorpay order.
//!
//! The order id is stored with a compare-and-set on the id seen while
//! pricing. When a concurrent checkout stores first, this request adopts the
//! winner's order and its own becomes an orphan on the provider side. A cart
//! edit in the meantime clears the stored order, and checkout gives up.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use bazaar_core::Money;
use bazaar_core::cart::{CheckoutRejection, ProviderOrderAction, quote_checkout};

use super::cart::price_cart;
use crate::db::carts::OrderIdUpdate;
use crate::db::{CartRepository, RepositoryError};
use crate::models::{CurrentUser, PricedCart};
use crate::razorpay::{CreateOrderRequest, RazorpayClient, RazorpayError};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Empty, paid or below-minimum cart. `Display` is user-facing.
    #[error("{0}")]
    Rejected(#[from] CheckoutRejection),

    /// Order creation failed.
    #[error("payment provider error: {0}")]
    Provider(#[from] RazorpayError),

    /// Items or coupon changed while the order was being created.
    #[error("Your cart changed during checkout. Please try again.")]
    CartChanged,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart waiting for payment of `order_id`.
#[derive(Debug)]
pub struct PendingPayment {
    pub cart: PricedCart,
    pub order_id: String,
    /// Amount of `order_id` in minor units.
    pub amount_minor: i64,
    /// Whether this request created `order_id`.
    pub created: bool,
}

/// Starts checkout for the signed-in user.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    razorpay: &'a RazorpayClient,
    minimum: Money,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, razorpay: &'a RazorpayClient, minimum: Money) -> Self {
        Self {
            pool,
            razorpay,
            minimum,
        }
    }

    /// Price the open cart and make sure it has a provider order for that
    /// amount.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Rejected` for an empty cart or a total below
    /// the minimum (no provider call is made), and
    /// `CheckoutError::Provider` if Razorpay fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn begin(&self, user: &CurrentUser) -> Result<PendingPayment, CheckoutError> {
        let carts = CartRepository::new(self.pool);

        let Some(cart) = carts.open_cart(user.id).await? else {
            return Err(CheckoutRejection::EmptyCart.into());
        };
        let cart = price_cart(self.pool, cart).await?;

        let currency = self.minimum.currency();
        let quote = quote_checkout(
            cart.cart.state(),
            cart.lines.len(),
            Money::new(cart.totals.total, currency),
            self.minimum,
        )?;

        let action = ProviderOrderAction::decide(
            cart.cart.razorpay_order_id.as_deref(),
            cart.cart.checkout_amount_paise,
            &quote,
        );

        if let ProviderOrderAction::Reuse(order_id) = action {
            info!(cart_id = %cart.cart.id, order_id, "Reusing provider order");
            let order_id = order_id.to_string();
            return Ok(PendingPayment {
                cart,
                order_id,
                amount_minor: quote.minor_units,
                created: false,
            });
        }

        let order = self
            .razorpay
            .create_order(&CreateOrderRequest {
                amount: quote.minor_units,
                currency: currency.code().to_string(),
                receipt: cart.cart.id.to_string(),
                payment_capture: 1,
            })
            .await?;

        let update = carts
            .set_provider_order(
                cart.cart.id,
                cart.cart.razorpay_order_id.as_deref(),
                &order.id,
                quote.minor_units,
            )
            .await?;

        match update {
            OrderIdUpdate::Stored => {
                info!(cart_id = %cart.cart.id, order_id = %order.id, amount = quote.minor_units, "Provider order stored");
                Ok(PendingPayment {
                    cart,
                    order_id: order.id,
                    amount_minor: quote.minor_units,
                    created: true,
                })
            }
            OrderIdUpdate::Lost(current) => {
                warn!(cart_id = %cart.cart.id, orphaned_order_id = %order.id, "Concurrent checkout stored another order");

                let Some(current) = current else {
                    return Err(CheckoutRejection::EmptyCart.into());
                };
                if current.is_paid {
                    return Err(CheckoutRejection::AlreadyPaid.into());
                }
                let (Some(order_id), Some(amount_minor)) =
                    (current.razorpay_order_id.clone(), current.checkout_amount_paise)
                else {
                    // The cart changed under us and dropped every order.
                    return Err(CheckoutError::CartChanged);
                };

                Ok(PendingPayment {
                    cart: PricedCart::new(current, cart.lines, cart.coupon),
                    order_id,
                    amount_minor,
                    created: false,
                })
            }
        }
    }
}
