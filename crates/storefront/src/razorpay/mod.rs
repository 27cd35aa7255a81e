//! Razorpay Orders API client.
//!
//! This module provides:
//! - [`RazorpayClient`] for creating orders
//! - Payment signature verification for the checkout return
//!
//! # Flow
//!
//! 1. Checkout creates an order for the cart total (in paise)
//! 2. The payment page opens Razorpay Checkout with the order id
//! 3. Razorpay redirects back with `order_id`, `razorpay_payment_id` and
//!    `razorpay_signature`
//! 4. The signature is verified before the cart is marked paid

mod client;
mod error;
mod types;

pub use client::{RazorpayClient, payment_signature};
pub use error::RazorpayError;
pub use types::{CreateOrderRequest, Order};
