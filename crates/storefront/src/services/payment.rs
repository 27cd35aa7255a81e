//! Payment finalization on return from Razorpay checkout.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use bazaar_core::{CartId, Money};

use super::cart::price_cart;
use crate::db::{CartRepository, RepositoryError};
use crate::models::CurrentUser;
use crate::razorpay::{RazorpayClient, RazorpayError};

/// Errors from payment finalization.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No cart of this user carries the order id.
    #[error("Order not found")]
    OrderNotFound,

    /// The callback signature did not verify.
    #[error("Payment could not be verified")]
    InvalidSignature(#[source] RazorpayError),

    /// The cart no longer matches what the order was created for.
    #[error("Your cart changed after payment started. Please check out again.")]
    CartChanged,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Parameters Razorpay appends to the success URL.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PaymentCallback {
    pub order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Result of a verified callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// This callback moved the cart to paid.
    Paid(CartId),
    /// The cart was already paid; nothing changed.
    AlreadyPaid(CartId),
}

/// Finalizes payments for the signed-in user.
pub struct PaymentService<'a> {
    pool: &'a PgPool,
    carts: CartRepository<'a>,
    razorpay: &'a RazorpayClient,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, razorpay: &'a RazorpayClient) -> Self {
        Self {
            pool,
            carts: CartRepository::new(pool),
            razorpay,
        }
    }

    /// Verify the callback and mark the cart paid.
    ///
    /// Nothing is written unless the order belongs to the user, the
    /// signature verifies and the cart still totals the order amount. A
    /// repeated callback is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::OrderNotFound` for an unknown order,
    /// `PaymentError::InvalidSignature` for a bad signature and
    /// `PaymentError::CartChanged` if the cart total no longer matches the
    /// order.
    #[instrument(skip(self, user, callback), fields(user_id = %user.id, order_id = %callback.order_id))]
    pub async fn finalize(
        &self,
        user: &CurrentUser,
        callback: &PaymentCallback,
    ) -> Result<PaymentOutcome, PaymentError> {
        let cart = self
            .carts
            .get_by_order_id(user.id, &callback.order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;

        self.razorpay
            .verify_payment_signature(
                &callback.order_id,
                &callback.razorpay_payment_id,
                &callback.razorpay_signature,
            )
            .map_err(|e| {
                warn!(cart_id = %cart.id, error = %e, "Rejected payment callback");
                PaymentError::InvalidSignature(e)
            })?;

        if cart.is_paid {
            return Ok(PaymentOutcome::AlreadyPaid(cart.id));
        }

        let cart_id = cart.id;
        let ordered = cart.checkout_amount_paise;
        let priced = price_cart(self.pool, cart).await?;
        let due = Money::new(priced.totals.total, self.razorpay.currency())
            .to_minor_units()
            .ok();
        if due.is_none() || due != ordered {
            warn!(%cart_id, ?ordered, ?due, "Cart total differs from the paid order");
            return Err(PaymentError::CartChanged);
        }

        if self
            .carts
            .mark_paid(cart_id, &callback.order_id, &callback.razorpay_payment_id)
            .await?
        {
            info!(%cart_id, payment_id = %callback.razorpay_payment_id, "Cart paid");
            return Ok(PaymentOutcome::Paid(cart_id));
        }

        // Lost to a repeat callback, or the cart changed and dropped the order.
        match self.carts.get_by_order_id(user.id, &callback.order_id).await? {
            Some(current) if current.is_paid => Ok(PaymentOutcome::AlreadyPaid(cart_id)),
            _ => Err(PaymentError::CartChanged),
        }
    }
}
