//! Status enums for carts and coupons.

use serde::{Deserialize, Serialize};

/// Lifecycle of a user's cart with respect to checkout.
///
/// ```text
/// Empty ──add item──▶ Open ──provider order──▶ AwaitingPayment ──verified return──▶ Paid
///                                  ▲                   │
///                                  └── re-price ───────┘
/// ```
///
/// `Paid` is terminal; the next purchase starts a fresh cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartState {
    /// The user has no open cart.
    #[default]
    Empty,
    /// Unpaid cart without a provider order.
    Open,
    /// Provider order created, waiting for the customer to pay.
    AwaitingPayment,
    /// Payment confirmed.
    Paid,
}

impl CartState {
    /// Derive the state from persisted cart columns.
    #[must_use]
    pub const fn from_columns(is_paid: bool, has_provider_order: bool) -> Self {
        match (is_paid, has_provider_order) {
            (true, _) => Self::Paid,
            (false, true) => Self::AwaitingPayment,
            (false, false) => Self::Open,
        }
    }

    /// Whether checkout may be entered from this state.
    #[must_use]
    pub const fn can_checkout(&self) -> bool {
        matches!(self, Self::Open | Self::AwaitingPayment)
    }

    /// Whether the state is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// How a coupon's discount value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.discount_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Fixed amount off the subtotal.
    Flat,
    /// Percentage of the subtotal.
    Percentage,
}
