//! Business logic services for the storefront.
//!
//! Handlers construct a service per request from `AppState` and pass the
//! signed-in `CurrentUser` into every call that touches user-owned rows.
//!
//! # Services
//!
//! - `auth` - Registration, activation, login, profile and password changes
//! - `cart` - Items, quantities and coupons on the open cart
//! - `checkout` - Razorpay order creation for the open cart
//! - `payment` - Signature-verified payment finalization
//! - `invoice` - PDF invoices for paid carts
//! - `email` - Activation email over SMTP

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod invoice;
pub mod payment;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService};
pub use email::EmailService;
pub use invoice::{InvoiceError, InvoiceService};
pub use payment::{PaymentError, PaymentService};
