//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in `db`.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod session;
pub mod user;

pub use address::{AddressInput, ShippingAddress};
pub use cart::{Cart, CartLine, Coupon, PricedCart};
pub use catalog::{ColorVariant, Product, SizeVariant};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
