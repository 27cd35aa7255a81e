//! Bazaar Core - Shared domain types and cart rules.
//!
//! This crate provides the types used across all Bazaar components:
//! - `storefront` - Public-facing shop (accounts, cart, checkout, invoices)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Pricing, coupon validation and the checkout state
//! machine live here so they can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and emails
//! - [`cart`] - Pricing calculator, coupon validator, checkout state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use types::*;
